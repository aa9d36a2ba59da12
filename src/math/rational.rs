use anyhow::{anyhow, Error, Result};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{Debug, Display},
    iter::Sum,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::ilp_framework::ilp_error::IlpError;

use super::traits::{One, Signed, Zero};

/// An exact fraction of arbitrary-precision integers.
///
/// The value is always stored reduced: the denominator is positive, numerator and denominator are
/// coprime, and zero is `0/1`. Two equal values therefore have identical representations, which makes
/// the derived `Eq`, `Ord` and `Hash` structural.
///
/// There is no `/` operator: division can fail, so it goes through [`Rational::checked_div`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

impl Rational {
    pub fn new(numer: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self> {
        let denom = denom.into();
        if Zero::is_zero(&denom) {
            return Err(IlpError::Arithmetic("fraction with a zero denominator".to_string()).into());
        }
        Ok(Self(BigRational::new(numer.into(), denom)))
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(value.into()))
    }

    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// The value as an integer, if it is one.
    pub fn to_integer(&self) -> Option<BigInt> {
        if self.is_integer() {
            Some(self.numer().clone())
        } else {
            None
        }
    }

    /// Largest integer not above the value.
    pub fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    /// Smallest integer not below the value.
    pub fn ceil(&self) -> Self {
        Self(self.0.ceil())
    }

    /**
     * The fractional part `self - floor(self)`, which lies in [0, 1) also for negative values.
     */
    pub fn fract(&self) -> Self {
        self - &self.floor()
    }

    pub fn checked_div(&self, rhs: &Rational) -> Result<Self> {
        if rhs.is_zero() {
            return Err(IlpError::Arithmetic(format!("division of {} by zero", self)).into());
        }
        Ok(Self(&self.0 / &rhs.0))
    }

    /**
     * 1/self
     */
    pub fn recip(&self) -> Result<Self> {
        Self::one().checked_div(self)
    }
}

impl One for Rational {
    fn one() -> Self {
        Self(<BigRational as num_traits::One>::one())
    }

    fn is_one(&self) -> bool {
        <BigRational as num_traits::One>::is_one(&self.0)
    }
}

impl Zero for Rational {
    fn zero() -> Self {
        Self(<BigRational as num_traits::Zero>::zero())
    }

    fn is_zero(&self) -> bool {
        <BigRational as num_traits::Zero>::is_zero(&self.0)
    }
}

impl Signed for Rational {
    fn abs(&self) -> Self {
        Self(<BigRational as num_traits::Signed>::abs(&self.0))
    }

    fn is_positive(&self) -> bool {
        <BigRational as num_traits::Signed>::is_positive(&self.0)
    }

    fn is_negative(&self) -> bool {
        <BigRational as num_traits::Signed>::is_negative(&self.0)
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Rational {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((numer, denom)) => Self::new(
                BigInt::from_str(numer.trim())
                    .map_err(|e| anyhow!("cannot parse numerator of `{}`: {}", s, e))?,
                BigInt::from_str(denom.trim())
                    .map_err(|e| anyhow!("cannot parse denominator of `{}`: {}", s, e))?,
            ),
            None => Ok(Self::from_integer(
                BigInt::from_str(s).map_err(|e| anyhow!("cannot parse `{}`: {}", s, e))?,
            )),
        }
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

impl Debug for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rational({})", self)
    }
}

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

impl From<&BigInt> for Rational {
    fn from(value: &BigInt) -> Self {
        Self::from_integer(value.clone())
    }
}

impl From<&Rational> for Rational {
    fn from(value: &Rational) -> Self {
        value.clone()
    }
}

impl TryFrom<&Rational> for BigInt {
    type Error = Error;

    fn try_from(value: &Rational) -> std::result::Result<Self, Self::Error> {
        value
            .to_integer()
            .ok_or_else(|| IlpError::Arithmetic(format!("{} is not an integer", value)).into())
    }
}

impl TryFrom<&Rational> for i64 {
    type Error = Error;

    fn try_from(value: &Rational) -> std::result::Result<Self, Self::Error> {
        BigInt::try_from(value)?.to_i64().ok_or_else(|| {
            IlpError::Arithmetic(format!("{} does not fit in a machine integer", value)).into()
        })
    }
}

impl Add<&Rational> for &Rational {
    type Output = Rational;

    fn add(self, rhs: &Rational) -> Self::Output {
        Rational(&self.0 + &rhs.0)
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Self::Output {
        Rational(self.0 + rhs.0)
    }
}

impl<T> AddAssign<T> for Rational
where
    T: Borrow<Rational>,
{
    fn add_assign(&mut self, rhs: T) {
        self.0 += &rhs.borrow().0;
    }
}

impl Sub<&Rational> for &Rational {
    type Output = Rational;

    fn sub(self, rhs: &Rational) -> Self::Output {
        Rational(&self.0 - &rhs.0)
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Self::Output {
        Rational(self.0 - rhs.0)
    }
}

impl<T> SubAssign<T> for Rational
where
    T: Borrow<Rational>,
{
    fn sub_assign(&mut self, rhs: T) {
        self.0 -= &rhs.borrow().0;
    }
}

impl Mul<&Rational> for &Rational {
    type Output = Rational;

    fn mul(self, rhs: &Rational) -> Self::Output {
        Rational(&self.0 * &rhs.0)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Self::Output {
        Rational(self.0 * rhs.0)
    }
}

impl<T> MulAssign<T> for Rational
where
    T: Borrow<Rational>,
{
    fn mul_assign(&mut self, rhs: T) {
        self.0 *= &rhs.borrow().0;
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Self::Output {
        Rational(-self.0)
    }
}

impl Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Self::Output {
        Rational(-&self.0)
    }
}

impl Sum for Rational {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |sum, f| sum + f)
    }
}

impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        iter.fold(Rational::zero(), |sum, f| &sum + f)
    }
}

/// Least common multiple of the denominators, i.e. the smallest positive integer that makes all
/// values integral when multiplied with it.
pub fn denominator_lcm<'a>(values: impl IntoIterator<Item = &'a Rational>) -> BigInt {
    values
        .into_iter()
        .fold(<BigInt as One>::one(), |lcm, value| lcm.lcm(value.denom()))
}

//======================== primitive types ========================//

macro_rules! primitive {
    ($t:ident) => {
        impl From<$t> for Rational {
            fn from(value: $t) -> Self {
                Self::from_integer(BigInt::from(value))
            }
        }

        impl TryFrom<($t, $t)> for Rational {
            type Error = Error;

            fn try_from(value: ($t, $t)) -> std::result::Result<Self, Self::Error> {
                Self::new(value.0, value.1)
            }
        }

        impl Add<$t> for &Rational {
            type Output = Rational;

            fn add(self, rhs: $t) -> Self::Output {
                self + &Rational::from(rhs)
            }
        }

        impl Add<$t> for Rational {
            type Output = Rational;

            fn add(self, rhs: $t) -> Self::Output {
                self + Rational::from(rhs)
            }
        }

        impl Sub<$t> for &Rational {
            type Output = Rational;

            fn sub(self, rhs: $t) -> Self::Output {
                self - &Rational::from(rhs)
            }
        }

        impl Sub<$t> for Rational {
            type Output = Rational;

            fn sub(self, rhs: $t) -> Self::Output {
                self - Rational::from(rhs)
            }
        }

        impl Mul<$t> for &Rational {
            type Output = Rational;

            fn mul(self, rhs: $t) -> Self::Output {
                self * &Rational::from(rhs)
            }
        }

        impl Mul<$t> for Rational {
            type Output = Rational;

            fn mul(self, rhs: $t) -> Self::Output {
                self * Rational::from(rhs)
            }
        }

        impl PartialEq<$t> for Rational {
            fn eq(&self, other: &$t) -> bool {
                self.is_integer() && self.numer() == &BigInt::from(*other)
            }
        }

        impl PartialOrd<$t> for Rational {
            fn partial_cmp(&self, other: &$t) -> Option<Ordering> {
                Some(self.cmp(&Rational::from(*other)))
            }
        }
    };
}

primitive!(i64);
primitive!(i32);
primitive!(u64);
primitive!(u32);
primitive!(usize);
