//! Error types for the filter.

use std::fmt;

/// Errors that can occur during filtering
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A covariance matrix could not be factorized (not positive definite)
    NonPositiveDefinite {
        /// Which matrix failed (e.g. "state covariance", "augmented covariance")
        context: String,
    },

    /// The expected-measurement covariance is not invertible
    SingularInnovationCov,

    /// Dimension mismatch between expected and actual
    DimensionMismatch {
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
        /// Context (e.g., "control vector", "measurement noise covariance")
        context: String,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::NonPositiveDefinite { context } => {
                write!(f, "Matrix square root failed for {}: not positive definite", context)
            }
            FilterError::SingularInnovationCov => {
                write!(f, "Singular innovation covariance: expected-measurement covariance is not invertible")
            }
            FilterError::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
        }
    }
}

impl std::error::Error for FilterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_definite_display() {
        let err = FilterError::NonPositiveDefinite {
            context: "augmented covariance".to_string(),
        };
        assert!(err.to_string().contains("augmented covariance"));
        assert!(err.to_string().contains("not positive definite"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = FilterError::DimensionMismatch {
            expected: 4,
            actual: 6,
            context: "control vector".to_string(),
        };
        assert!(err.to_string().contains("4"));
        assert!(err.to_string().contains("6"));
        assert!(err.to_string().contains("control vector"));
    }

    #[test]
    fn test_singular_innovation_display() {
        let err = FilterError::SingularInnovationCov;
        assert!(err.to_string().contains("not invertible"));
    }
}
