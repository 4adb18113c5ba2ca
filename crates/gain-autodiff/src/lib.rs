//! Reverse-mode automatic differentiation over dense matrices.
//!
//! Every value in a graph is a `DMatrix<f64>`; scalars are 1x1 matrices.
//! [`Graph`] records operations, [`ops`] and [`broadcast`] define their
//! forward and backward rules, and [`backward()`] propagates gradients.
//! [`GraphExt`] adds method-style builders on top of [`Graph::apply_op`].
//!
//! A fresh graph is built for every training step. Values that must not
//! receive gradients (data, masks, parameters of a frozen network) are added
//! with [`Graph::constant`].
//!
//! ```
//! use gain_autodiff::prelude::*;
//!
//! let graph = Graph::new();
//! let w = graph.variable(Tensor::from_row_slice(1, 2, &[1.0, -2.0]));
//! let loss = graph.sum(graph.pow(w.id, 2.0));
//! let grads = grad(&graph, loss, &[w.id]).unwrap();
//! assert_eq!(grads[0], Tensor::from_row_slice(1, 2, &[2.0, -4.0]));
//! ```

pub mod backward;
pub mod broadcast;
pub mod error;
pub mod ext;
pub mod graph;
pub mod ops;

// Re-export key types
pub use backward::{backward, check_gradients, grad, GradientMap};
pub use broadcast::{broadcast_shape, broadcast_to, unbroadcast, BroadcastAdd};
pub use error::{AutodiffError, AutodiffResult};
pub use ext::GraphExt;
pub use graph::{Graph, Node, NodeId, Tensor, Variable};
pub use ops::Op;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backward::{backward, check_gradients, grad, GradientMap};
    pub use crate::broadcast::BroadcastAdd;
    pub use crate::error::{AutodiffError, AutodiffResult};
    pub use crate::ext::GraphExt;
    pub use crate::graph::{Graph, Node, NodeId, Tensor, Variable};
    pub use crate::ops::Op;
}
