//! The optimizer abstraction shared by all update rules.

use gain_core::error::{GainError, Result};
use gain_core::types::{shape_of, Matrix};

/// A first-order update rule over a fixed list of parameter matrices.
///
/// The optimizer keeps per-parameter state (moments, velocities) indexed by
/// position, so `params` must be passed in the same order on every call.
pub trait Optimizer: std::fmt::Debug {
    /// Applies one update `params <- params - step(grads)` in place.
    fn step(&mut self, params: &mut [Matrix], grads: &[Matrix]) -> Result<()>;

    /// Returns the name of this optimizer.
    fn name(&self) -> &str;

    /// Drops all accumulated state.
    fn reset(&mut self);

    /// Number of steps taken since creation or the last reset.
    fn iterations(&self) -> usize;
}

/// Checks that parameters and gradients line up one to one.
pub fn check_gradients(params: &[Matrix], grads: &[Matrix]) -> Result<()> {
    if params.len() != grads.len() {
        return Err(GainError::shape_mismatch(
            "gradient count",
            params.len(),
            grads.len(),
        ));
    }
    for (index, (p, g)) in params.iter().zip(grads).enumerate() {
        if p.shape() != g.shape() {
            return Err(GainError::shape_mismatch(
                format!("gradient of parameter {}", index),
                shape_of(p),
                shape_of(g),
            ));
        }
    }
    Ok(())
}

/// Rescales `grad` so its Frobenius norm does not exceed `threshold`.
pub fn clip_gradient(grad: &Matrix, threshold: Option<f64>) -> Matrix {
    match threshold {
        Some(max_norm) => {
            let norm = grad.norm();
            if norm > max_norm && norm > 0.0 {
                grad * (max_norm / norm)
            } else {
                grad.clone()
            }
        }
        None => grad.clone(),
    }
}
