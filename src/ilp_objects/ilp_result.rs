use anyhow::Result;
use num_bigint::BigInt;
use std::{collections::BTreeMap, fmt::Display};

use crate::{ilp_framework::ilp_error::IlpError, math::rational::Rational};

/// An optimal integer solution: the value of every original variable and the objective value there.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IlpResult {
    pub soln: BTreeMap<String, BigInt>,
    pub obj_val: Rational,
}

impl IlpResult {
    pub fn get(&self, name: &str) -> Option<&BigInt> {
        self.soln.get(name)
    }
}

impl Display for IlpResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "objective {}", self.obj_val)?;
        for (name, value) in &self.soln {
            write!(f, ", {} = {}", name, value)?;
        }
        Ok(())
    }
}

/// What a solve produced. Infeasibility and unboundedness are answers, not failures; errors are
/// reserved for malformed input and broken invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IlpOutcome {
    Solved(IlpResult),
    Infeasible,
    Unbounded,
}

impl IlpOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, IlpOutcome::Solved(_))
    }

    pub fn result(&self) -> Option<&IlpResult> {
        match self {
            IlpOutcome::Solved(result) => Some(result),
            _ => None,
        }
    }

    /// Turns infeasibility and unboundedness into errors, for callers that only want a solution.
    pub fn into_result(self) -> Result<IlpResult> {
        match self {
            IlpOutcome::Solved(result) => Ok(result),
            IlpOutcome::Infeasible => Err(IlpError::Infeasible.into()),
            IlpOutcome::Unbounded => Err(IlpError::Unbounded.into()),
        }
    }
}
