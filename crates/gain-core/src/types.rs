//! Type definitions and aliases for the imputation workspace.
//!
//! All numeric work happens in `f64` on dense `nalgebra` matrices. The
//! autodiff graph, the optimizers and the networks share these aliases.

pub use nalgebra::{DMatrix, DVector};

/// Dense 2-D matrix of observations, masks and parameters.
pub type Matrix = DMatrix<f64>;

/// Shape of a 3-D tensor: `[location, day, time-of-day]` in the traffic setting.
pub type Shape3 = [usize; 3];

/// Numerical constants shared by the training loop and the evaluator.
pub mod constants {
    /// Offset added inside logarithms of probabilities to avoid `log(0)`.
    pub const LOG_EPSILON: f64 = 1e-8;

    /// Default weight of the reconstruction loss.
    pub const DEFAULT_ALPHA: f64 = 10.0;

    /// Default iteration budget.
    pub const DEFAULT_MAX_ITER: usize = 4000;

    /// Default diagnostics interval.
    pub const DEFAULT_REPORT_INTERVAL: usize = 500;

    /// Default missing rate.
    pub const DEFAULT_MISSING_RATE: f64 = 0.2;

    /// Default optimizer learning rate.
    pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

    /// Default seed for parameter initialisation and synthetic data.
    pub const DEFAULT_SEED: u64 = 1000;
}

/// Formats a matrix shape as `[rows, cols]` for error messages.
pub fn shape_of(m: &Matrix) -> String {
    format!("[{}, {}]", m.nrows(), m.ncols())
}
