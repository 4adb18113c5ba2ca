//! Dynamic computation graph.
//!
//! Nodes live in a vector in creation order. An operation can only refer to
//! nodes that already exist, so creation order is a topological order and
//! every traversal (and therefore every gradient sum) is deterministic.
//!
//! The graph is built behind `&self` so that expression builders can nest
//! calls such as `g.elu(g.add_bias(g.matmul(x, w), b))`.

use crate::error::{AutodiffError, AutodiffResult};
use crate::ops::Op;
use nalgebra::DMatrix;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Values flowing through the graph; scalars are 1x1.
pub type Tensor = DMatrix<f64>;

/// Handle on a node of one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

/// A leaf whose gradient can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    /// Node holding the value
    pub id: NodeId,
    /// False when created on a [`Graph::no_grad`] graph
    pub requires_grad: bool,
}

/// One vertex of the graph.
#[derive(Debug)]
pub struct Node {
    /// Cached value; always present for leaves
    pub value: Option<Tensor>,
    /// Producing operation; `None` for leaves
    pub op: Option<Box<dyn Op>>,
    /// Operands of `op`
    pub inputs: Vec<NodeId>,
    /// Whether gradients flow into this node
    pub requires_grad: bool,
}

impl Node {
    fn leaf(value: Tensor, requires_grad: bool) -> Self {
        Self {
            value: Some(value),
            op: None,
            inputs: Vec::new(),
            requires_grad,
        }
    }

    /// True for variables and constants.
    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }
}

/// Append-only computation graph.
#[derive(Debug)]
pub struct Graph {
    nodes: RefCell<Vec<Rc<RefCell<Node>>>>,
    track_gradients: bool,
}

impl Graph {
    /// Graph that records gradient requirements.
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            track_gradients: true,
        }
    }

    /// Graph for inference only: no node requires a gradient.
    pub fn no_grad() -> Self {
        Self {
            nodes: RefCell::new(Vec::new()),
            track_gradients: false,
        }
    }

    fn push(&self, node: Node) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Rc::new(RefCell::new(node)));
        NodeId(nodes.len() - 1)
    }

    fn requires_grad(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(|n| n.borrow().requires_grad)
    }

    /// Adds a differentiable leaf.
    pub fn variable(&self, value: Tensor) -> Variable {
        let requires_grad = self.track_gradients;
        Variable {
            id: self.push(Node::leaf(value, requires_grad)),
            requires_grad,
        }
    }

    /// Adds a leaf that never receives a gradient.
    pub fn constant(&self, value: Tensor) -> NodeId {
        self.push(Node::leaf(value, false))
    }

    /// 1x1 constant.
    pub fn scalar(&self, value: f64) -> NodeId {
        self.constant(Tensor::from_element(1, 1, value))
    }

    /// Adds `op(inputs)`; the value is computed lazily by [`Graph::forward`].
    pub fn apply_op(&self, op: Box<dyn Op>, inputs: &[NodeId]) -> NodeId {
        let requires_grad = self.track_gradients && inputs.iter().any(|&id| self.requires_grad(id));
        self.push(Node {
            value: None,
            op: Some(op),
            inputs: inputs.to_vec(),
            requires_grad,
        })
    }

    /// Shared handle on a node.
    pub fn get_node(&self, id: NodeId) -> Option<Rc<RefCell<Node>>> {
        self.nodes.borrow().get(id.0).cloned()
    }

    /// Cached value of a node, if computed.
    pub fn get_value(&self, id: NodeId) -> Option<Tensor> {
        self.get_node(id).and_then(|node| node.borrow().value.clone())
    }

    /// Overwrites the cached value of a node.
    pub fn set_value(&self, id: NodeId, value: Tensor) {
        if let Some(node) = self.get_node(id) {
            node.borrow_mut().value = Some(value);
        }
    }

    /// Computes `target` and the nodes it depends on, caching every value.
    pub fn forward(&self, target: NodeId) -> AutodiffResult<Tensor> {
        let node = self.get_node(target).ok_or(AutodiffError::UnknownNode(target))?;

        let inputs = {
            let node = node.borrow();
            match (&node.value, node.is_leaf()) {
                (Some(value), _) => return Ok(value.clone()),
                (None, true) => return Err(AutodiffError::MissingValue(target)),
                (None, false) => node.inputs.clone(),
            }
        };

        let input_values = inputs
            .iter()
            .map(|&id| self.forward(id))
            .collect::<AutodiffResult<Vec<_>>>()?;

        let value = {
            let node = node.borrow();
            let op = node.op.as_ref().ok_or(AutodiffError::MissingValue(target))?;
            op.forward(&input_values)
        };
        node.borrow_mut().value = Some(value.clone());
        Ok(value)
    }

    /// Runs [`Graph::forward`] on a 1x1 node and unwraps the scalar.
    pub fn forward_scalar(&self, target: NodeId) -> AutodiffResult<f64> {
        let value = self.forward(target)?;
        if value.shape() != (1, 1) {
            return Err(AutodiffError::NotScalar {
                node: target,
                shape: value.shape(),
            });
        }
        Ok(value[(0, 0)])
    }

    /// Drops cached values of operation nodes so the next forward recomputes them.
    pub fn clear_values(&self) {
        for node in self.nodes.borrow().iter() {
            let mut node = node.borrow_mut();
            if !node.is_leaf() {
                node.value = None;
            }
        }
    }

    /// Node ids in creation order.
    pub fn topological_order(&self) -> Vec<NodeId> {
        (0..self.num_nodes()).map(NodeId).collect()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Whether new nodes can require gradients.
    pub fn tracks_gradients(&self) -> bool {
        self.track_gradients
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Add, MatMul};

    #[test]
    fn test_variable_and_constant() {
        let graph = Graph::new();
        assert!(graph.tracks_gradients());

        let x = graph.variable(Tensor::from_element(2, 2, 1.0));
        let c = graph.constant(Tensor::from_element(1, 1, 4.0));
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(x.id.index(), 0);
        assert!(x.requires_grad);
        assert!(!graph.requires_grad(c));
        assert_eq!(graph.get_value(x.id).unwrap().shape(), (2, 2));
    }

    #[test]
    fn test_requires_grad_propagates_from_variables() {
        let graph = Graph::new();
        let c = graph.constant(Tensor::from_element(1, 1, 4.0));
        let x = graph.variable(Tensor::from_element(1, 1, 1.0));

        let cc = graph.apply_op(Box::new(Add), &[c, c]);
        let cx = graph.apply_op(Box::new(Add), &[c, x.id]);
        assert!(!graph.requires_grad(cc));
        assert!(graph.requires_grad(cx));
    }

    #[test]
    fn test_no_grad_graph() {
        let graph = Graph::no_grad();
        let x = graph.variable(Tensor::from_element(1, 1, 1.0));
        assert!(!x.requires_grad);
        let y = graph.apply_op(Box::new(Add), &[x.id, x.id]);
        assert!(!graph.requires_grad(y));
        assert_eq!(graph.forward_scalar(y).unwrap(), 2.0);
    }

    #[test]
    fn test_topological_order_is_creation_order() {
        let graph = Graph::new();
        let a = graph.variable(Tensor::from_element(2, 2, 1.0));
        let b = graph.constant(Tensor::identity(2, 2));
        let c = graph.apply_op(Box::new(MatMul), &[a.id, b]);
        assert_eq!(graph.topological_order(), vec![a.id, b, c]);
    }

    #[test]
    fn test_forward_caches_and_clears() {
        let graph = Graph::new();
        let x = graph.variable(Tensor::from_element(1, 1, 2.0));
        let y = graph.apply_op(Box::new(Add), &[x.id, x.id]);
        assert!(graph.get_value(y).is_none());

        assert_eq!(graph.forward(y).unwrap()[(0, 0)], 4.0);
        assert!(graph.get_value(y).is_some());

        graph.clear_values();
        assert!(graph.get_value(y).is_none());
        assert!(graph.get_value(x.id).is_some());

        graph.set_value(x.id, Tensor::from_element(1, 1, 5.0));
        assert_eq!(graph.forward(y).unwrap()[(0, 0)], 10.0);
    }

    #[test]
    fn test_forward_scalar_rejects_matrix() {
        let graph = Graph::new();
        let x = graph.variable(Tensor::from_element(2, 2, 3.0));
        assert!(matches!(
            graph.forward_scalar(x.id),
            Err(AutodiffError::NotScalar { shape: (2, 2), .. })
        ));
        let s = graph.scalar(1.5);
        assert_eq!(graph.forward_scalar(s).unwrap(), 1.5);
    }

    #[test]
    fn test_unknown_node() {
        let graph = Graph::new();
        let other = Graph::new();
        other.scalar(1.0);
        let foreign = other.scalar(2.0);
        assert!(matches!(graph.forward(foreign), Err(AutodiffError::UnknownNode(_))));
    }
}
