//! Error types for the imputation experiment.
//!
//! Every fallible operation in the workspace reports one of the variants
//! below. Shape problems are caught at load time, degenerate masks before
//! training starts, and non-finite losses at the iteration where they appear.

use thiserror::Error;

/// Errors that can occur while loading data, building masks, training or
/// evaluating an imputation run.
#[derive(Debug, Error)]
pub enum GainError {
    /// Two arrays that must agree in shape do not.
    ///
    /// This error occurs when the ground-truth tensor and the random inputs
    /// have different leading dimensions, or when a flat buffer does not
    /// match its declared shape.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected
        context: String,
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// The observation mask is all-observed or all-missing.
    ///
    /// Losses normalised by `mean(M)` or `mean(1 - M)` are undefined for
    /// such masks.
    #[error("Degenerate mask: {reason}")]
    DegenerateMask {
        /// Which mean vanished
        reason: String,
    },

    /// A loss became NaN or infinite during training.
    #[error("Numerical instability at iteration {iteration}: {quantity} is not finite")]
    NumericalInstability {
        /// Iteration at which the value was observed
        iteration: usize,
        /// Name of the offending quantity
        quantity: String,
    },

    /// Invalid experiment configuration.
    #[error("Invalid configuration for `{parameter}` = {value}: {reason}")]
    InvalidConfiguration {
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was rejected
        value: String,
        /// Description of the constraint
        reason: String,
    },

    /// The computation graph could not evaluate or differentiate a node.
    #[error("Computation graph error: {reason}")]
    Computation {
        /// Description of the failure
        reason: String,
    },

    /// The evaluation index set (observed in the original data but hidden
    /// by the mask) is empty.
    #[error("No held-out cells to evaluate")]
    NoHeldOutCells,

    /// Underlying I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that was being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A data or configuration document could not be parsed.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that was being parsed
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl GainError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch<C, S1, S2>(context: C, expected: S1, actual: S2) -> Self
    where
        C: Into<String>,
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a DegenerateMask error with a custom reason.
    pub fn degenerate_mask<S: Into<String>>(reason: S) -> Self {
        Self::DegenerateMask {
            reason: reason.into(),
        }
    }

    /// Create a NumericalInstability error for the given iteration.
    pub fn numerical_instability<S: Into<String>>(iteration: usize, quantity: S) -> Self {
        Self::NumericalInstability {
            iteration,
            quantity: quantity.into(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: std::fmt::Display,
        R: Into<String>,
    {
        Self::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Wrap a parse error with the path it occurred on.
    pub fn parse<P: AsRef<std::path::Path>>(path: P, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GainError>;
