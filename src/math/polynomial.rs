use anyhow::{anyhow, Result};
use num_bigint::BigInt;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use super::{
    rational::{denominator_lcm, Rational},
    traits::{One, Signed, Zero},
};

/// Key under which the constant term is stored.
pub const CONSTANT: &str = "";

/// An affine expression `Σ cᵢ·xᵢ + c₀` over named variables with rational coefficients.
///
/// Zero coefficients are never stored, so structural equality, ordering and hashing coincide with
/// mathematical equality. The ordering is that of the sorted `(variable, coefficient)` sequence,
/// which lets polynomials key ordered maps.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Polynomial {
    terms: BTreeMap<String, Rational>,
}

impl Polynomial {
    pub fn new() -> Self {
        Self::default()
    }

    /// The polynomial `1·name`.
    pub fn var(name: impl Into<String>) -> Self {
        Self::term(name, Rational::one())
    }

    /// The polynomial `coeff·name`.
    pub fn term(name: impl Into<String>, coeff: impl Into<Rational>) -> Self {
        let mut result = Self::new();
        result.add_term(name.into(), coeff.into());
        result
    }

    pub fn constant_poly(value: impl Into<Rational>) -> Self {
        Self::term(CONSTANT, value)
    }

    /// Coefficient of `name`; zero if the variable does not occur.
    pub fn get(&self, name: &str) -> Rational {
        self.terms.get(name).cloned().unwrap_or_else(Rational::zero)
    }

    pub fn constant(&self) -> Rational {
        self.get(CONSTANT)
    }

    /// The variables with a non-zero coefficient, in sorted order.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.terms
            .keys()
            .map(|name| name.as_str())
            .filter(|name| *name != CONSTANT)
    }

    pub fn var_set(&self) -> BTreeSet<String> {
        self.var_names().map(|name| name.to_string()).collect()
    }

    /// The non-constant terms as `(variable, coefficient)` pairs, in sorted order.
    pub fn linear_terms(&self) -> impl Iterator<Item = (&str, &Rational)> {
        self.terms
            .iter()
            .filter(|(name, _)| name.as_str() != CONSTANT)
            .map(|(name, coeff)| (name.as_str(), coeff))
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.var_names().next().is_none()
    }

    /// The polynomial without its constant term.
    pub fn without_constant(&self) -> Self {
        let mut result = self.clone();
        result.terms.remove(CONSTANT);
        result
    }

    /// Smallest positive integer that makes every coefficient integral when multiplied with it.
    pub fn denominator_lcm(&self) -> BigInt {
        denominator_lcm(self.terms.values())
    }

    /// Evaluates the polynomial at an integer assignment. Every variable must be assigned.
    pub fn eval(&self, assignment: &BTreeMap<String, BigInt>) -> Result<Rational> {
        let mut result = self.constant();
        for (name, coeff) in self.linear_terms() {
            let value = assignment
                .get(name)
                .ok_or_else(|| anyhow!("variable `{}` has no value", name))?;
            result += coeff * &Rational::from(value);
        }
        Ok(result)
    }

    /// Replaces every occurrence of `name` by `replacement`.
    pub fn substitute(&self, name: &str, replacement: &Polynomial) -> Self {
        match self.terms.get(name) {
            Some(coeff) if name != CONSTANT => {
                let mut result = self.clone();
                result.terms.remove(name);
                result + replacement * coeff
            }
            _ => self.clone(),
        }
    }

    fn add_term(&mut self, name: String, coeff: Rational) {
        if coeff.is_zero() {
            return;
        }
        match self.terms.get_mut(&name) {
            Some(existing) => {
                *existing += coeff;
                if existing.is_zero() {
                    self.terms.remove(&name);
                }
            }
            None => {
                self.terms.insert(name, coeff);
            }
        }
    }

    fn scale(&mut self, factor: &Rational) {
        if factor.is_zero() {
            self.terms.clear();
        } else {
            self.terms.values_mut().for_each(|coeff| *coeff *= factor);
        }
    }
}

impl Display for Polynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let constant = self.constant();
        let terms = self
            .linear_terms()
            .map(|(name, coeff)| (Some(name), coeff.clone()))
            .chain((!constant.is_zero()).then(|| (None, constant)));
        for (i, (name, coeff)) in terms.enumerate() {
            let magnitude = coeff.abs();
            match (i, coeff.is_negative()) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            match name {
                Some(name) if magnitude.is_one() => write!(f, "{}", name)?,
                Some(name) => write!(f, "{}*{}", magnitude, name)?,
                None => write!(f, "{}", magnitude)?,
            }
        }
        Ok(())
    }
}

impl Debug for Polynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Polynomial({})", self)
    }
}

impl From<Rational> for Polynomial {
    fn from(value: Rational) -> Self {
        Self::constant_poly(value)
    }
}

impl From<&str> for Polynomial {
    fn from(value: &str) -> Self {
        Self::var(value)
    }
}

impl AddAssign<&Polynomial> for Polynomial {
    fn add_assign(&mut self, rhs: &Polynomial) {
        for (name, coeff) in &rhs.terms {
            self.add_term(name.clone(), coeff.clone());
        }
    }
}

impl AddAssign for Polynomial {
    fn add_assign(&mut self, rhs: Polynomial) {
        for (name, coeff) in rhs.terms {
            self.add_term(name, coeff);
        }
    }
}

impl SubAssign<&Polynomial> for Polynomial {
    fn sub_assign(&mut self, rhs: &Polynomial) {
        for (name, coeff) in &rhs.terms {
            self.add_term(name.clone(), -coeff);
        }
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(mut self, rhs: Polynomial) -> Self::Output {
        self += rhs;
        self
    }
}

impl Add<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Self::Output {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(mut self, rhs: Polynomial) -> Self::Output {
        self -= &rhs;
        self
    }
}

impl Sub<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Self::Output {
        let mut result = self.clone();
        result -= rhs;
        result
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(mut self) -> Self::Output {
        self.terms.values_mut().for_each(|coeff| *coeff = -&*coeff);
        self
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Self::Output {
        -self.clone()
    }
}

impl Mul<&Rational> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Rational) -> Self::Output {
        let mut result = self.clone();
        result.scale(rhs);
        result
    }
}

impl Mul<Rational> for Polynomial {
    type Output = Polynomial;

    fn mul(mut self, rhs: Rational) -> Self::Output {
        self.scale(&rhs);
        self
    }
}

impl Mul<Polynomial> for Rational {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Self::Output {
        rhs * self
    }
}

//======================== primitive types ========================//

macro_rules! primitive {
    ($t:ident) => {
        impl Add<$t> for Polynomial {
            type Output = Polynomial;

            fn add(mut self, rhs: $t) -> Self::Output {
                self.add_term(CONSTANT.to_string(), Rational::from(rhs));
                self
            }
        }

        impl Sub<$t> for Polynomial {
            type Output = Polynomial;

            fn sub(mut self, rhs: $t) -> Self::Output {
                self.add_term(CONSTANT.to_string(), -Rational::from(rhs));
                self
            }
        }

        impl Mul<$t> for Polynomial {
            type Output = Polynomial;

            fn mul(mut self, rhs: $t) -> Self::Output {
                self.scale(&Rational::from(rhs));
                self
            }
        }

        impl Mul<Polynomial> for $t {
            type Output = Polynomial;

            fn mul(self, rhs: Polynomial) -> Self::Output {
                rhs * self
            }
        }

        impl From<$t> for Polynomial {
            fn from(value: $t) -> Self {
                Self::constant_poly(value)
            }
        }
    };
}

primitive!(i64);

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use std::collections::{BTreeMap, HashSet};

    use crate::math::{rational::Rational, traits::Zero};

    use super::Polynomial;

    #[test]
    fn polynomial_zero_terms_are_dropped() {
        let p = Polynomial::var("x") + Polynomial::var("y") - Polynomial::var("x");
        assert_eq!(p, Polynomial::var("y"));
        assert_eq!(p.var_names().collect::<Vec<_>>(), vec!["y"]);
        assert!((Polynomial::var("x") * 0).is_zero());
        assert!((Polynomial::var("x") + 3 - 3 - Polynomial::var("x")).is_zero());
    }

    #[test]
    fn polynomial_get_does_not_insert() {
        let p = 3 * Polynomial::var("x") + 4;
        assert!(p.get("y").is_zero());
        assert_eq!(p.get("x"), 3);
        assert_eq!(p.constant(), 4);
        assert_eq!(p.var_names().count(), 1);
        assert_eq!(p, 3 * Polynomial::var("x") + 4);
    }

    #[test]
    fn polynomial_double_negation() {
        let p = Polynomial::var("i_0") + 2 * Polynomial::var("k_0") - 7;
        assert_eq!(-(-p.clone()), p);
        assert_eq!(-&-&p, p);
    }

    #[test]
    fn polynomial_structural_equality() {
        let a = Polynomial::term("x", 2) + Polynomial::var("y");
        let b = Polynomial::var("y") + Polynomial::var("x") + Polynomial::var("x");
        assert_eq!(a, b);

        let mut map = BTreeMap::new();
        map.insert(a.clone(), 1);
        map.insert(b.clone(), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&a], 2);

        let set: HashSet<Polynomial> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn polynomial_order() {
        assert!(Polynomial::var("a") < Polynomial::var("b"));
        assert!(-Polynomial::var("a") < Polynomial::var("a"));
        assert_ne!(-Polynomial::var("i_0"), Polynomial::var("i_0"));
    }

    #[test]
    fn polynomial_eval() {
        let p = Polynomial::term("x", Rational::new(1, 2).unwrap()) - 3 * Polynomial::var("y") + 1;
        let mut assignment = BTreeMap::new();
        assignment.insert("x".to_string(), BigInt::from(4));
        assignment.insert("y".to_string(), BigInt::from(-1));
        assert_eq!(p.eval(&assignment).unwrap(), 6);

        assignment.remove("y");
        assert!(p.eval(&assignment).is_err());
    }

    #[test]
    fn polynomial_substitute() {
        let p = 2 * Polynomial::var("x") + Polynomial::var("y");
        let q = p.substitute("x", &(Polynomial::var("z") + 1));
        assert_eq!(q, 2 * Polynomial::var("z") + Polynomial::var("y") + 2);
        assert_eq!(p.substitute("w", &Polynomial::var("z")), p);
    }

    #[test]
    fn polynomial_display() {
        assert_eq!((3 * Polynomial::var("x") + 4).to_string(), "3*x + 4");
        assert_eq!((Polynomial::var("x") - Polynomial::var("y") - 2).to_string(), "x - y - 2");
        assert_eq!((-2 * Polynomial::var("x") + 1).to_string(), "-2*x + 1");
        assert_eq!(Polynomial::new().to_string(), "0");
        assert_eq!(Polynomial::from(5).to_string(), "5");
    }

    #[test]
    fn polynomial_denominator_lcm() {
        let p = Polynomial::term("x", Rational::new(1, 2).unwrap())
            + Polynomial::constant_poly(Rational::new(2, 3).unwrap());
        assert_eq!(p.denominator_lcm(), BigInt::from(6));
        assert!(!p.without_constant().is_zero());
        assert!(p.without_constant().constant().is_zero());
        assert!(Polynomial::from(3).is_constant());
    }
}
