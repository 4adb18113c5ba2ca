//! Errors raised while evaluating or differentiating a graph.

use crate::graph::NodeId;
use gain_core::GainError;
use thiserror::Error;

/// Failures of the computation graph.
#[derive(Debug, Clone, Error)]
pub enum AutodiffError {
    /// The node id does not belong to this graph.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// A leaf node has no value, or an operation node has no operation.
    #[error("No value available for {0}")]
    MissingValue(NodeId),

    /// Two shapes cannot be broadcast together.
    #[error("Incompatible shapes for broadcasting: {lhs:?} and {rhs:?}")]
    IncompatibleShapes {
        /// Left operand shape
        lhs: (usize, usize),
        /// Right operand shape
        rhs: (usize, usize),
    },

    /// A scalar was requested from a non-1x1 node.
    #[error("{node} is not a scalar: shape {shape:?}")]
    NotScalar {
        /// Offending node
        node: NodeId,
        /// Its shape
        shape: (usize, usize),
    },
}

/// Result type for graph operations.
pub type AutodiffResult<T> = std::result::Result<T, AutodiffError>;

impl From<AutodiffError> for GainError {
    fn from(err: AutodiffError) -> Self {
        GainError::Computation {
            reason: err.to_string(),
        }
    }
}
