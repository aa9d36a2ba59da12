use thiserror::Error;

/// The kinds of failure the engine reports.
///
/// Functions return `anyhow::Result`; these variants travel inside it and can be recovered with
/// `error.downcast_ref::<IlpError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IlpError {
    /// Division by zero or another degenerate arithmetic operation.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// A range constraint that cannot describe a non-empty interval, or a constraint system
    /// without variables.
    #[error("malformed constraint: {0}")]
    MalformedConstraint(String),

    /// A tableau whose dense entries do not match its declared shape.
    #[error("malformed tableau: {0}")]
    MalformedTableau(String),

    /// No point satisfies all constraints.
    #[error("the constraint system is infeasible")]
    Infeasible,

    /// The objective decreases without limit.
    #[error("the objective is unbounded")]
    Unbounded,

    /// A canonical-form invariant was broken; this is a bug, not a property of the input.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl IlpError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, IlpError::Infeasible)
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, IlpError::Unbounded)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::IlpError;

    fn fails() -> Result<()> {
        Err(IlpError::MalformedConstraint("range must be positive".to_string()).into())
    }

    #[test]
    fn error_downcast() {
        let err = fails().unwrap_err();
        assert_eq!(
            err.downcast_ref::<IlpError>(),
            Some(&IlpError::MalformedConstraint(
                "range must be positive".to_string()
            ))
        );
        assert_eq!(
            err.to_string(),
            "malformed constraint: range must be positive"
        );
    }

    #[test]
    fn error_kinds() {
        assert!(IlpError::Infeasible.is_infeasible());
        assert!(!IlpError::Infeasible.is_unbounded());
        assert!(IlpError::Unbounded.is_unbounded());
    }
}
