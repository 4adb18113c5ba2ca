//! Finite-difference checks of gradients through the layer shapes used by
//! the generator and discriminator.

use gain_autodiff::prelude::*;
use proptest::prelude::*;

fn dense(rows: usize, cols: usize, seed: f64) -> Tensor {
    Tensor::from_fn(rows, cols, |i, j| ((i * cols + j) as f64 * 0.37 + seed).sin() * 0.8)
}

/// Builds `mean(act(add_bias([x | m] * w, b)))` and returns (loss, w, b).
fn layer(graph: &Graph, activation: fn(&Graph, NodeId) -> NodeId) -> (NodeId, Variable, Variable) {
    let x = graph.constant(dense(4, 3, 0.1));
    let m = graph.constant(Tensor::from_fn(4, 3, |i, j| ((i + j) % 2) as f64));
    let w = graph.variable(dense(6, 5, 1.3));
    let b = graph.variable(dense(1, 5, 2.1));

    let input = graph.concat_columns(x, m);
    let pre = graph.add_bias(graph.matmul(input, w.id), b.id);
    let loss = graph.mean(activation(graph, pre));
    (loss, w, b)
}

#[test]
fn test_elu_layer_gradients() {
    let graph = Graph::new();
    let (loss, w, b) = layer(&graph, |g, n| g.elu(n));

    assert!(check_gradients(&graph, loss, w.id, 1e-6).unwrap() < 1e-5);
    assert!(check_gradients(&graph, loss, b.id, 1e-6).unwrap() < 1e-5);
}

#[test]
fn test_sigmoid_layer_gradients() {
    let graph = Graph::new();
    let (loss, w, b) = layer(&graph, |g, n| g.sigmoid(n));

    assert!(check_gradients(&graph, loss, w.id, 1e-6).unwrap() < 1e-5);
    assert!(check_gradients(&graph, loss, b.id, 1e-6).unwrap() < 1e-5);
}

#[test]
fn test_masked_reconstruction_gradient() {
    // mean((M*X - M*G)^2) / mean(M) with G = elu(W)
    let graph = Graph::new();
    let x = graph.constant(dense(3, 4, 0.5));
    let mask_value = Tensor::from_fn(3, 4, |i, j| if (i + 2 * j) % 3 == 0 { 0.0 } else { 1.0 });
    let mask_mean = mask_value.mean();
    let m = graph.constant(mask_value);
    let w = graph.variable(dense(3, 4, 0.9));

    let g = graph.elu(w.id);
    let diff = graph.sub(graph.mul(m, x), graph.mul(m, g));
    let loss = graph.scale(graph.mean(graph.pow(diff, 2.0)), 1.0 / mask_mean);

    assert!(check_gradients(&graph, loss, w.id, 1e-6).unwrap() < 1e-5);
}

#[test]
fn test_log_loss_gradient() {
    let graph = Graph::new();
    let logits = graph.variable(dense(2, 3, 0.3));
    let d = graph.sigmoid(logits.id);
    let loss = graph.neg(graph.mean(graph.log(graph.add_scalar(d, 1e-8))));

    assert!(check_gradients(&graph, loss, logits.id, 1e-6).unwrap() < 1e-5);
}

#[test]
fn test_frozen_parameters_get_no_gradient() {
    let graph = Graph::new();
    let x = graph.constant(dense(2, 2, 0.0));
    let frozen = graph.constant(dense(2, 2, 1.0));
    let trained = graph.variable(dense(2, 2, 2.0));

    let out = graph.matmul(graph.matmul(x, frozen), trained.id);
    let loss = graph.sum(out);
    let grads = backward(&graph, loss, None).unwrap();

    assert!(grads.contains_key(&trained.id));
    assert!(!grads.contains_key(&frozen));
}

proptest! {
    #[test]
    fn prop_elu_gradient_matches_finite_differences(seed in -3.0f64..3.0) {
        let graph = Graph::new();
        let w = graph.variable(dense(2, 3, seed));
        let loss = graph.sum(graph.elu(graph.scale(w.id, 2.0)));

        let err = check_gradients(&graph, loss, w.id, 1e-6).unwrap();
        prop_assert!(err < 1e-4, "relative error {}", err);
    }
}
