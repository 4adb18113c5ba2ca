//! Row and column broadcasting.
//!
//! Shapes are 2-D; a dimension of size one is repeated to match the other
//! operand. The networks use this to add a `1 x n` bias row to every row of
//! a `batch x n` activation matrix.

use crate::error::{AutodiffError, AutodiffResult};
use crate::graph::Tensor;
use crate::ops::Op;

/// Shape of `a ⊕ b` when one or both operands are broadcast.
pub fn broadcast_shape(
    shape_a: (usize, usize),
    shape_b: (usize, usize),
) -> AutodiffResult<(usize, usize)> {
    let dim = |a: usize, b: usize| match (a, b) {
        _ if a == b => Some(a),
        (1, _) => Some(b),
        (_, 1) => Some(a),
        _ => None,
    };

    match (dim(shape_a.0, shape_b.0), dim(shape_a.1, shape_b.1)) {
        (Some(rows), Some(cols)) => Ok((rows, cols)),
        _ => Err(AutodiffError::IncompatibleShapes {
            lhs: shape_a,
            rhs: shape_b,
        }),
    }
}

/// Repeats the unit dimensions of `tensor` up to `target`.
pub fn broadcast_to(tensor: &Tensor, target: (usize, usize)) -> AutodiffResult<Tensor> {
    let (rows, cols) = tensor.shape();
    if (rows != target.0 && rows != 1) || (cols != target.1 && cols != 1) {
        return Err(AutodiffError::IncompatibleShapes {
            lhs: tensor.shape(),
            rhs: target,
        });
    }
    if tensor.shape() == target {
        return Ok(tensor.clone());
    }
    Ok(Tensor::from_fn(target.0, target.1, |i, j| {
        tensor[(i.min(rows - 1), j.min(cols - 1))]
    }))
}

/// Sums `grad` over the dimensions that were repeated to reach its shape
/// from `original`.
pub fn unbroadcast(grad: &Tensor, original: (usize, usize)) -> Tensor {
    if grad.shape() == original {
        return grad.clone();
    }
    let (rows, cols) = grad.shape();
    let row_span = if original.0 == rows { 1 } else { rows };
    let col_span = if original.1 == cols { 1 } else { cols };
    Tensor::from_fn(original.0, original.1, |i, j| {
        grad.view((i, j), (row_span, col_span)).sum()
    })
}

/// `a + b` with broadcasting of unit dimensions.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastAdd;

impl Op for BroadcastAdd {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let [a, b] = inputs else {
            panic!("BroadcastAdd takes 2 inputs, got {}", inputs.len());
        };
        let expanded = broadcast_shape(a.shape(), b.shape())
            .and_then(|shape| Ok((broadcast_to(a, shape)?, broadcast_to(b, shape)?)));
        match expanded {
            Ok((a, b)) => a + b,
            Err(e) => panic!("BroadcastAdd: {}", e),
        }
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        inputs
            .iter()
            .map(|input| unbroadcast(grad_output, input.shape()))
            .collect()
    }

    fn name(&self) -> &str {
        "BroadcastAdd"
    }
}
