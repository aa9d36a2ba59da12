use num::{One as NumOne, Signed as NumSigned, Zero as NumZero};
use num_bigint::BigInt;

/// Multiplicative identity of the exact number types used by the tableau.
pub trait One: Sized {
    fn one() -> Self;

    fn is_one(&self) -> bool;
}

/// Additive identity; zero entries are what the simplex skips when eliminating.
pub trait Zero: Sized {
    fn zero() -> Self;

    fn is_zero(&self) -> bool;
}

/// Sign tests used by the ratio tests and the feasibility checks.
pub trait Signed: Sized {
    fn abs(&self) -> Self;

    fn is_positive(&self) -> bool;

    fn is_negative(&self) -> bool;

    /// Zero or positive, i.e. admissible as the value of a standard-form variable.
    fn is_non_negative(&self) -> bool {
        !self.is_negative()
    }
}

impl One for BigInt {
    fn one() -> Self {
        NumOne::one()
    }

    fn is_one(&self) -> bool {
        NumOne::is_one(self)
    }
}

impl Zero for BigInt {
    fn zero() -> Self {
        NumZero::zero()
    }

    fn is_zero(&self) -> bool {
        NumZero::is_zero(self)
    }
}

impl Signed for BigInt {
    fn abs(&self) -> Self {
        NumSigned::abs(self)
    }

    fn is_positive(&self) -> bool {
        NumSigned::is_positive(self)
    }

    fn is_negative(&self) -> bool {
        NumSigned::is_negative(self)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::{One, Signed, Zero};

    #[test]
    fn bigint_identities_and_signs() {
        let one = <BigInt as One>::one();
        assert!(one.is_one());
        assert!(one.is_positive());
        assert!(one.is_non_negative());

        let zero = <BigInt as Zero>::zero();
        assert!(Zero::is_zero(&zero));
        assert!(!zero.is_positive());
        assert!(zero.is_non_negative());

        let minus_seven = BigInt::from(-7);
        assert!(minus_seven.is_negative());
        assert!(!minus_seven.is_non_negative());
        assert_eq!(Signed::abs(&minus_seven), BigInt::from(7));
    }
}
