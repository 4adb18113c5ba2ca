//! Imputation accuracy metrics.
//!
//! Metrics are computed over cells that are present in the original data
//! (non-zero) but hidden by the synthetic mask (zero in the sparse matrix).

use crate::error::{GainError, Result};
use crate::mask::ensure_same_shape;
use crate::types::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MAPE and RMSE over the held-out cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputationMetrics {
    /// Mean absolute percentage error (a fraction, not a percentage)
    pub mape: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Number of cells the metrics were computed over
    pub count: usize,
}

impl fmt::Display for ImputationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MAPE = {}", self.mape)?;
        write!(f, "RMSE = {}", self.rmse)
    }
}

/// Indices `(row, col)` where `truth != 0` and `sparse == 0`.
pub fn held_out_indices(truth: &Matrix, sparse: &Matrix) -> Result<Vec<(usize, usize)>> {
    ensure_same_shape("held-out index set", truth, sparse)?;
    let mut indices = Vec::new();
    for j in 0..truth.ncols() {
        for i in 0..truth.nrows() {
            if truth[(i, j)] != 0.0 && sparse[(i, j)] == 0.0 {
                indices.push((i, j));
            }
        }
    }
    Ok(indices)
}

/// Evaluates `pred` against `truth` on the held-out cells.
///
/// Returns [`GainError::NoHeldOutCells`] when nothing was hidden.
pub fn evaluate(truth: &Matrix, pred: &Matrix, sparse: &Matrix) -> Result<ImputationMetrics> {
    ensure_same_shape("prediction", truth, pred)?;
    let indices = held_out_indices(truth, sparse)?;
    if indices.is_empty() {
        return Err(GainError::NoHeldOutCells);
    }

    let mut abs_pct = 0.0;
    let mut sq = 0.0;
    for &(i, j) in &indices {
        let t = truth[(i, j)];
        let diff = t - pred[(i, j)];
        abs_pct += diff.abs() / t;
        sq += diff * diff;
    }
    let count = indices.len();
    Ok(ImputationMetrics {
        mape: abs_pct / count as f64,
        rmse: (sq / count as f64).sqrt(),
        count,
    })
}

/// `mean((W·a - W·b)^2) / mean(W)` for a binary weight matrix `W`.
///
/// This is the squared reconstruction error restricted to the cells selected
/// by `weights`; the training loop reports its square root.
pub fn weighted_mse(a: &Matrix, b: &Matrix, weights: &Matrix) -> Result<f64> {
    ensure_same_shape("weighted mse", a, b)?;
    ensure_same_shape("weighted mse weights", a, weights)?;
    let n = weights.len() as f64;
    let mean_w = weights.sum() / n;
    if mean_w == 0.0 {
        return Err(GainError::degenerate_mask(
            "weight matrix has zero mean; the restricted error is undefined",
        ));
    }
    let diff = a.component_mul(weights) - b.component_mul(weights);
    let mse = diff.map(|d| d * d).sum() / n;
    Ok(mse / mean_w)
}
