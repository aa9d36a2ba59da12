use anyhow::Result;
use num_bigint::BigInt;
use std::fmt::Display;

use crate::{
    ilp_framework::ilp_error::IlpError,
    math::{polynomial::Polynomial, traits::Signed},
};

/// The constraint `0 <= poly < range` on an affine expression.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeConstraint {
    poly: Polynomial,
    range: BigInt,
}

impl RangeConstraint {
    /// Fails with a malformed-constraint error if `range` is not positive, as the interval would be
    /// empty.
    pub fn new(poly: Polynomial, range: impl Into<BigInt>) -> Result<Self> {
        let range = range.into();
        if !range.is_positive() {
            return Err(IlpError::MalformedConstraint(format!(
                "range of `0 <= {} < {}` must be positive",
                poly, range
            ))
            .into());
        }
        Ok(Self { poly, range })
    }

    pub fn poly(&self) -> &Polynomial {
        &self.poly
    }

    pub fn range(&self) -> &BigInt {
        &self.range
    }
}

impl Display for RangeConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0 <= {} < {}", self.poly, self.range)
    }
}
