//! Reverse-mode gradient propagation.
//!
//! Gradients are pushed from the output towards the leaves in reverse
//! creation order. Contributions reaching the same node through several
//! paths are summed in a fixed order, so results are reproducible.

use crate::error::{AutodiffError, AutodiffResult};
use crate::graph::{Graph, NodeId, Tensor};
use std::collections::HashMap;

/// Gradient of the output with respect to each node that requires one.
pub type GradientMap = HashMap<NodeId, Tensor>;

/// Backpropagates from `output_node`, running its forward pass first.
///
/// `grad_output` seeds the output gradient; `None` means all ones. Only
/// nodes that require gradients (and the output itself) appear in the map.
pub fn backward(
    graph: &Graph,
    output_node: NodeId,
    grad_output: Option<Tensor>,
) -> AutodiffResult<GradientMap> {
    let output_value = graph.forward(output_node)?;
    let seed = grad_output
        .unwrap_or_else(|| Tensor::from_element(output_value.nrows(), output_value.ncols(), 1.0));

    let mut gradients = GradientMap::new();
    gradients.insert(output_node, seed);

    // Later nodes cannot feed the output.
    let order = graph.topological_order();
    for &id in order[..=output_node.index()].iter().rev() {
        let Some(upstream) = gradients.get(&id).cloned() else {
            continue;
        };
        let node = graph.get_node(id).ok_or(AutodiffError::UnknownNode(id))?;
        let node = node.borrow();
        let Some(op) = node.op.as_ref().filter(|_| node.requires_grad) else {
            continue;
        };

        let inputs = node
            .inputs
            .iter()
            .map(|&input| graph.get_value(input).ok_or(AutodiffError::MissingValue(input)))
            .collect::<AutodiffResult<Vec<_>>>()?;
        let value = node.value.as_ref().ok_or(AutodiffError::MissingValue(id))?;

        for (&input, contribution) in node.inputs.iter().zip(op.backward(&upstream, &inputs, value)) {
            let wants_grad = graph
                .get_node(input)
                .is_some_and(|n| n.borrow().requires_grad);
            if !wants_grad {
                continue;
            }
            match gradients.get_mut(&input) {
                Some(total) => *total += contribution,
                None => {
                    gradients.insert(input, contribution);
                }
            }
        }
    }

    Ok(gradients)
}

/// Gradients of `output_node` with respect to `input_nodes`, in order.
///
/// An input the output does not depend on gets zeros of its own shape.
pub fn grad(graph: &Graph, output_node: NodeId, input_nodes: &[NodeId]) -> AutodiffResult<Vec<Tensor>> {
    let mut all_grads = backward(graph, output_node, None)?;

    input_nodes
        .iter()
        .map(|&input_id| match all_grads.remove(&input_id) {
            Some(grad) => Ok(grad),
            None => {
                let value = graph
                    .get_value(input_id)
                    .ok_or(AutodiffError::MissingValue(input_id))?;
                Ok(Tensor::zeros(value.nrows(), value.ncols()))
            }
        })
        .collect()
}

/// Largest relative error between the backpropagated gradient of a scalar
/// output and a central finite-difference estimate, over every entry of the
/// leaf `input_node`. The leaf value is restored afterwards.
pub fn check_gradients(
    graph: &Graph,
    output_node: NodeId,
    input_node: NodeId,
    epsilon: f64,
) -> AutodiffResult<f64> {
    let analytical_grad = grad(graph, output_node, &[input_node])?.remove(0);

    let original_value = graph
        .get_value(input_node)
        .ok_or(AutodiffError::MissingValue(input_node))?;

    let evaluate = |value: Tensor| -> AutodiffResult<f64> {
        graph.set_value(input_node, value);
        graph.clear_values();
        graph.forward_scalar(output_node)
    };

    let mut max_error: f64 = 0.0;
    for i in 0..original_value.nrows() {
        for j in 0..original_value.ncols() {
            let mut plus = original_value.clone();
            plus[(i, j)] += epsilon;
            let f_plus = evaluate(plus)?;

            let mut minus = original_value.clone();
            minus[(i, j)] -= epsilon;
            let f_minus = evaluate(minus)?;

            let numerical = (f_plus - f_minus) / (2.0 * epsilon);
            let analytical = analytical_grad[(i, j)];

            let abs_error = (numerical - analytical).abs();
            let denom = numerical.abs().max(analytical.abs()).max(1e-8);
            max_error = max_error.max(abs_error / denom);
        }
    }

    evaluate(original_value)?;
    Ok(max_error)
}
