//! Method-style builders on top of [`Graph::apply_op`].
//!
//! Network code reads much better as `g.elu(g.add_bias(g.matmul(x, w), b))`
//! than as nested `apply_op(Box::new(..), &[..])` calls.

use crate::broadcast::BroadcastAdd;
use crate::graph::{Graph, NodeId};
use crate::ops::{
    Add, AddScalar, ConcatColumns, Elu, Log, MatMul, Mean, Multiply, Negate, Pow, Scale, Sigmoid,
    Subtract, Sum, Transpose,
};

/// Convenience operations for building expressions on a [`Graph`].
pub trait GraphExt {
    /// Element-wise `a + b`.
    fn add(&self, a: NodeId, b: NodeId) -> NodeId;
    /// Element-wise `a - b`.
    fn sub(&self, a: NodeId, b: NodeId) -> NodeId;
    /// Element-wise (Hadamard) product.
    fn mul(&self, a: NodeId, b: NodeId) -> NodeId;
    /// Matrix product `a * b`.
    fn matmul(&self, a: NodeId, b: NodeId) -> NodeId;
    /// Transpose.
    fn transpose(&self, a: NodeId) -> NodeId;
    /// Adds a `1 x n` row to every row of `a`.
    fn add_bias(&self, a: NodeId, bias: NodeId) -> NodeId;
    /// Sum of all entries, as a 1x1 node.
    fn sum(&self, a: NodeId) -> NodeId;
    /// Mean of all entries, as a 1x1 node.
    fn mean(&self, a: NodeId) -> NodeId;
    /// Element-wise negation.
    fn neg(&self, a: NodeId) -> NodeId;
    /// Adds a constant to every entry.
    fn add_scalar(&self, a: NodeId, value: f64) -> NodeId;
    /// Multiplies every entry by a constant.
    fn scale(&self, a: NodeId, factor: f64) -> NodeId;
    /// Element-wise power.
    fn pow(&self, a: NodeId, exponent: f64) -> NodeId;
    /// Element-wise natural logarithm.
    fn log(&self, a: NodeId) -> NodeId;
    /// ELU activation with unit scale.
    fn elu(&self, a: NodeId) -> NodeId;
    /// Logistic sigmoid.
    fn sigmoid(&self, a: NodeId) -> NodeId;
    /// Column-wise concatenation `[a | b]`.
    fn concat_columns(&self, a: NodeId, b: NodeId) -> NodeId;
}

impl GraphExt for Graph {
    fn add(&self, a: NodeId, b: NodeId) -> NodeId {
        self.apply_op(Box::new(Add), &[a, b])
    }

    fn sub(&self, a: NodeId, b: NodeId) -> NodeId {
        self.apply_op(Box::new(Subtract), &[a, b])
    }

    fn mul(&self, a: NodeId, b: NodeId) -> NodeId {
        self.apply_op(Box::new(Multiply), &[a, b])
    }

    fn matmul(&self, a: NodeId, b: NodeId) -> NodeId {
        self.apply_op(Box::new(MatMul), &[a, b])
    }

    fn transpose(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Transpose), &[a])
    }

    fn add_bias(&self, a: NodeId, bias: NodeId) -> NodeId {
        self.apply_op(Box::new(BroadcastAdd), &[a, bias])
    }

    fn sum(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Sum), &[a])
    }

    fn mean(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Mean), &[a])
    }

    fn neg(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Negate), &[a])
    }

    fn add_scalar(&self, a: NodeId, value: f64) -> NodeId {
        self.apply_op(Box::new(AddScalar { value }), &[a])
    }

    fn scale(&self, a: NodeId, factor: f64) -> NodeId {
        self.apply_op(Box::new(Scale { factor }), &[a])
    }

    fn pow(&self, a: NodeId, exponent: f64) -> NodeId {
        self.apply_op(Box::new(Pow { exponent }), &[a])
    }

    fn log(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Log), &[a])
    }

    fn elu(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Elu), &[a])
    }

    fn sigmoid(&self, a: NodeId) -> NodeId {
        self.apply_op(Box::new(Sigmoid), &[a])
    }

    fn concat_columns(&self, a: NodeId, b: NodeId) -> NodeId {
        self.apply_op(Box::new(ConcatColumns), &[a, b])
    }
}
