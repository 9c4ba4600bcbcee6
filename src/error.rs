//! Error types for efficient-frontier.

use thiserror::Error;

/// Error type for portfolio optimization operations.
#[derive(Debug, Error)]
pub enum FrontierError {
    /// No weight vector satisfies every constraint.
    #[error("Problem is infeasible: {0}")]
    Infeasible(String),

    /// A linear system was too close to singular to solve reliably.
    #[error("Singular system: pivot ratio {pivot_ratio:e} below tolerance")]
    SingularSystem { pivot_ratio: f64 },

    /// The active-set iteration did not converge.
    #[error("Iteration limit exceeded after {iterations} iterations")]
    IterationLimitExceeded { iterations: usize },

    /// A frontier sweep produced no usable points.
    #[error("Empty frontier: none of the {requested} target returns could be solved")]
    EmptyFrontier { requested: usize },

    /// Malformed input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch between inputs.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Output error while rendering.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while rendering.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FrontierError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Whether a frontier sweep may skip the failing point and continue.
    ///
    /// Per-solve failures are recoverable; malformed inputs and output
    /// errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrontierError::Infeasible(_)
                | FrontierError::SingularSystem { .. }
                | FrontierError::IterationLimitExceeded { .. }
                | FrontierError::NumericalError(_)
        )
    }
}

/// Result type for efficient-frontier operations.
pub type Result<T> = std::result::Result<T, FrontierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(FrontierError::Infeasible("target".into()).is_recoverable());
        assert!(FrontierError::SingularSystem { pivot_ratio: 1e-14 }.is_recoverable());
        assert!(FrontierError::IterationLimitExceeded { iterations: 30 }.is_recoverable());
        assert!(!FrontierError::InvalidInput("nan".into()).is_recoverable());
        assert!(!FrontierError::EmptyFrontier { requested: 10 }.is_recoverable());
        assert!(!FrontierError::shape_mismatch("3", "2").is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = FrontierError::shape_mismatch("3x3", "3x2");
        assert_eq!(err.to_string(), "Shape mismatch: expected 3x3, got 3x2");
    }
}
