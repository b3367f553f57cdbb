//! Error types for saddle-point search.
//!
//! Only fatal conditions are represented here. Soft outcomes (budget
//! exhaustion, line-search failure, step-size underflow) are ordinary
//! return values carried by [`crate::termination::TerminationReason`].

use thiserror::Error;

/// Errors that can occur while running a saddle-point search.
#[derive(Debug, Clone, Error)]
pub enum SaddleError {
    /// Numerical instability detected.
    ///
    /// Raised when a not-a-number value is found in the position or the
    /// search direction at the top of an iteration. This is a known failure
    /// mode of Barzilai-Borwein type step selection and is not retried; the
    /// caller must restart with different initial data or a different method.
    /// Log entries already pushed remain valid.
    #[error("Numerical instability at iteration {iteration}: {reason}")]
    NumericalInstability {
        /// Iteration at which the instability was detected
        iteration: usize,
        /// Description of the numerical issue
        reason: String,
    },

    /// Invalid controller configuration.
    ///
    /// Raised immediately, before any state mutation (e.g. an unrecognized
    /// step-size extrapolation mode or a nonpositive tolerance).
    #[error("Invalid configuration: {reason} ({parameter} = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Dimension mismatch between inputs.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Oracle evaluation failed.
    ///
    /// This error wraps failures reported by an energy/gradient or
    /// rate-field oracle during a run.
    #[error("Oracle evaluation failed: {reason}")]
    OracleFailure {
        /// Description of the oracle failure
        reason: String,
    },
}

impl SaddleError {
    /// Create a NumericalInstability error with iteration context.
    pub fn numerical_instability<S: Into<String>>(iteration: usize, reason: S) -> Self {
        Self::NumericalInstability {
            iteration,
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an OracleFailure error.
    pub fn oracle_failure<S: Into<String>>(reason: S) -> Self {
        Self::OracleFailure {
            reason: reason.into(),
        }
    }
}

/// Result type alias for saddle-search operations.
pub type Result<T> = std::result::Result<T, SaddleError>;
