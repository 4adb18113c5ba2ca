//! Generator and discriminator networks.
//!
//! Both networks are three-layer perceptrons over the column-wise
//! concatenation of two `[batch, num_col]` matrices. Hidden layers use ELU;
//! the generator keeps ELU on its output layer while the discriminator ends
//! with a logistic sigmoid.
//!
//! Every forward pass is expressed once, as a graph builder. Training builds
//! it with the trained network's parameters as variables and the other
//! network's parameters as constants; the eager `generate` / `discriminate`
//! calls run the same builder on a gradient-free graph.

use gain_autodiff::{Graph, GraphExt, NodeId};
use gain_core::error::{GainError, Result};
use gain_core::mask::ensure_same_shape;
use gain_core::types::{shape_of, Matrix};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Number of affine layers in each network.
pub const NUM_LAYERS: usize = 3;

/// Output nonlinearity of the last layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// Exponential linear unit, unbounded reconstructions
    Elu,
    /// Logistic sigmoid, per-cell probabilities
    Sigmoid,
}

/// How parameters enter a computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    /// Added as variables; gradients are tracked
    Trainable,
    /// Added as constants; the network is read-only in this graph
    Frozen,
}

/// Nodes produced by building a network into a graph.
#[derive(Debug, Clone)]
pub struct NetworkNodes {
    /// Output of the last layer
    pub output: NodeId,
    /// Parameter nodes in [`NetworkParameters::as_slice`] order
    pub parameters: Vec<NodeId>,
}

/// Weights and biases of a three-layer perceptron.
///
/// Stored as `[w1, b1, w2, b2, w3, b3]`; weights are `fan_in x fan_out`,
/// biases are `1 x fan_out` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParameters {
    tensors: Vec<Matrix>,
}

impl NetworkParameters {
    /// Xavier-normal weights with `stddev = sqrt(2 / fan_in)` and zero biases.
    pub fn xavier_init<R: Rng + ?Sized>(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if input_dim == 0 || hidden_dim == 0 || output_dim == 0 {
            return Err(GainError::invalid_configuration(
                "layer widths",
                format!("{}-{}-{}", input_dim, hidden_dim, output_dim),
                "every layer needs at least one unit",
            ));
        }

        let layout = [(input_dim, hidden_dim), (hidden_dim, hidden_dim), (hidden_dim, output_dim)];
        let mut tensors = Vec::with_capacity(2 * NUM_LAYERS);
        for (fan_in, fan_out) in layout {
            tensors.push(xavier_normal(fan_in, fan_out, rng)?);
            tensors.push(Matrix::zeros(1, fan_out));
        }
        Ok(Self { tensors })
    }

    /// Builds parameters from explicit tensors, checking the layer chain.
    pub fn from_tensors(tensors: Vec<Matrix>) -> Result<Self> {
        if tensors.len() != 2 * NUM_LAYERS {
            return Err(GainError::shape_mismatch(
                "network parameter count",
                2 * NUM_LAYERS,
                tensors.len(),
            ));
        }
        let mut fan_in = tensors[0].nrows();
        for layer in 0..NUM_LAYERS {
            let (w, b) = (&tensors[2 * layer], &tensors[2 * layer + 1]);
            if w.nrows() != fan_in {
                return Err(GainError::shape_mismatch(
                    format!("weight of layer {}", layer + 1),
                    format!("[{}, _]", fan_in),
                    shape_of(w),
                ));
            }
            if b.shape() != (1, w.ncols()) {
                return Err(GainError::shape_mismatch(
                    format!("bias of layer {}", layer + 1),
                    format!("[1, {}]", w.ncols()),
                    shape_of(b),
                ));
            }
            fan_in = w.ncols();
        }
        Ok(Self { tensors })
    }

    /// Weight of layer `layer` (0-based).
    pub fn weight(&self, layer: usize) -> &Matrix {
        &self.tensors[2 * layer]
    }

    /// Bias row of layer `layer` (0-based).
    pub fn bias(&self, layer: usize) -> &Matrix {
        &self.tensors[2 * layer + 1]
    }

    /// Number of input columns.
    pub fn input_dim(&self) -> usize {
        self.tensors[0].nrows()
    }

    /// Width of the hidden layers.
    pub fn hidden_dim(&self) -> usize {
        self.tensors[0].ncols()
    }

    /// Number of output columns.
    pub fn output_dim(&self) -> usize {
        self.tensors[2 * NUM_LAYERS - 2].ncols()
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }

    /// All tensors in `[w1, b1, w2, b2, w3, b3]` order.
    pub fn as_slice(&self) -> &[Matrix] {
        &self.tensors
    }

    /// Mutable access for optimizer updates.
    pub fn as_mut_slice(&mut self) -> &mut [Matrix] {
        &mut self.tensors
    }

    /// Adds the perceptron applied to `input` to `graph`.
    pub fn build(
        &self,
        graph: &Graph,
        input: NodeId,
        activation: OutputActivation,
        mode: ParameterMode,
    ) -> NetworkNodes {
        let parameters: Vec<NodeId> = self
            .tensors
            .iter()
            .map(|t| match mode {
                ParameterMode::Trainable => graph.variable(t.clone()).id,
                ParameterMode::Frozen => graph.constant(t.clone()),
            })
            .collect();

        let mut hidden = input;
        for layer in 0..NUM_LAYERS {
            let affine = graph.add_bias(
                graph.matmul(hidden, parameters[2 * layer]),
                parameters[2 * layer + 1],
            );
            hidden = if layer + 1 < NUM_LAYERS {
                graph.elu(affine)
            } else {
                match activation {
                    OutputActivation::Elu => graph.elu(affine),
                    OutputActivation::Sigmoid => graph.sigmoid(affine),
                }
            };
        }

        NetworkNodes {
            output: hidden,
            parameters,
        }
    }
}

fn xavier_normal<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Result<Matrix> {
    let stddev = (2.0 / fan_in as f64).sqrt();
    let normal = Normal::new(0.0, stddev).map_err(|e| {
        GainError::invalid_configuration("xavier stddev", stddev, e.to_string())
    })?;
    Ok(Matrix::from_fn(fan_in, fan_out, |_, _| normal.sample(rng)))
}

/// Checks a `(data, mask-like)` pair against a network expecting
/// `2 * num_col` inputs.
fn check_pair(context: &str, params: &NetworkParameters, data: &Matrix, side: &Matrix) -> Result<()> {
    ensure_same_shape(context, data, side)?;
    if 2 * data.ncols() != params.input_dim() {
        return Err(GainError::shape_mismatch(
            context,
            format!("[_, {}]", params.input_dim() / 2),
            shape_of(data),
        ));
    }
    Ok(())
}

fn run_eager(
    params: &NetworkParameters,
    activation: OutputActivation,
    data: &Matrix,
    side: &Matrix,
) -> Result<Matrix> {
    let graph = Graph::no_grad();
    let data = graph.constant(data.clone());
    let side = graph.constant(side.clone());
    let input = graph.concat_columns(data, side);
    let nodes = params.build(&graph, input, activation, ParameterMode::Frozen);
    Ok(graph.forward(nodes.output)?)
}

/// Maps `(masked data, mask)` to a full reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    params: NetworkParameters,
}

impl Generator {
    /// Xavier-initialised generator for `num_col` features.
    ///
    /// `hidden` defaults to `num_col`.
    pub fn new<R: Rng + ?Sized>(num_col: usize, hidden: Option<usize>, rng: &mut R) -> Result<Self> {
        let hidden = hidden.unwrap_or(num_col);
        Ok(Self {
            params: NetworkParameters::xavier_init(2 * num_col, hidden, num_col, rng)?,
        })
    }

    /// Wraps existing parameters.
    pub fn from_parameters(params: NetworkParameters) -> Result<Self> {
        if params.input_dim() != 2 * params.output_dim() {
            return Err(GainError::shape_mismatch(
                "generator input width",
                2 * params.output_dim(),
                params.input_dim(),
            ));
        }
        Ok(Self { params })
    }

    /// The generator's parameters.
    pub fn parameters(&self) -> &NetworkParameters {
        &self.params
    }

    /// Mutable parameters, for optimizer updates.
    pub fn parameters_mut(&mut self) -> &mut NetworkParameters {
        &mut self.params
    }

    /// Adds `G([x | mask])` to `graph`.
    pub fn build(&self, graph: &Graph, x: NodeId, mask: NodeId, mode: ParameterMode) -> NetworkNodes {
        let input = graph.concat_columns(x, mask);
        self.params.build(graph, input, OutputActivation::Elu, mode)
    }

    /// Eager forward pass. The output is not composed with the observed data.
    pub fn generate(&self, x: &Matrix, mask: &Matrix) -> Result<Matrix> {
        check_pair("generator input", &self.params, x, mask)?;
        run_eager(&self.params, OutputActivation::Elu, x, mask)
    }
}

/// Maps `(hybrid data, hint)` to per-cell probabilities of being observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    params: NetworkParameters,
}

impl Discriminator {
    /// Xavier-initialised discriminator for `num_col` features.
    ///
    /// `hidden` defaults to `num_col`.
    pub fn new<R: Rng + ?Sized>(num_col: usize, hidden: Option<usize>, rng: &mut R) -> Result<Self> {
        let hidden = hidden.unwrap_or(num_col);
        Ok(Self {
            params: NetworkParameters::xavier_init(2 * num_col, hidden, num_col, rng)?,
        })
    }

    /// Wraps existing parameters.
    pub fn from_parameters(params: NetworkParameters) -> Result<Self> {
        if params.input_dim() != 2 * params.output_dim() {
            return Err(GainError::shape_mismatch(
                "discriminator input width",
                2 * params.output_dim(),
                params.input_dim(),
            ));
        }
        Ok(Self { params })
    }

    /// The discriminator's parameters.
    pub fn parameters(&self) -> &NetworkParameters {
        &self.params
    }

    /// Mutable parameters, for optimizer updates.
    pub fn parameters_mut(&mut self) -> &mut NetworkParameters {
        &mut self.params
    }

    /// Adds `D([x_hat | hint])` to `graph`.
    pub fn build(&self, graph: &Graph, x_hat: NodeId, hint: NodeId, mode: ParameterMode) -> NetworkNodes {
        let input = graph.concat_columns(x_hat, hint);
        self.params.build(graph, input, OutputActivation::Sigmoid, mode)
    }

    /// Eager forward pass.
    pub fn discriminate(&self, x_hat: &Matrix, hint: &Matrix) -> Result<Matrix> {
        check_pair("discriminator input", &self.params, x_hat, hint)?;
        run_eager(&self.params, OutputActivation::Sigmoid, x_hat, hint)
    }
}

/// `x_hat = mask ⊙ x + (1 - mask) ⊙ generated`.
///
/// Observed cells pass through untouched; only missing cells carry the
/// generator's guess.
pub fn compose(mask: &Matrix, x: &Matrix, generated: &Matrix) -> Result<Matrix> {
    ensure_same_shape("composition data", mask, x)?;
    ensure_same_shape("composition generator output", mask, generated)?;
    Ok(Matrix::from_fn(mask.nrows(), mask.ncols(), |i, j| {
        let m = mask[(i, j)];
        m * x[(i, j)] + (1.0 - m) * generated[(i, j)]
    }))
}

/// Graph version of [`compose`]; `not_mask` must hold `1 - mask`.
pub fn compose_node(graph: &Graph, mask: NodeId, not_mask: NodeId, x: NodeId, generated: NodeId) -> NodeId {
    graph.add(graph.mul(mask, x), graph.mul(not_mask, generated))
}
