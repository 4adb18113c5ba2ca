//! Adam optimizer.
//!
//! Adam (Adaptive Moment Estimation) combines momentum with per-entry
//! adaptive learning rates. The update at step t for every parameter entry:
//!
//! 1. m_t = β₁ m_{t-1} + (1-β₁) g_t
//! 2. v_t = β₂ v_{t-1} + (1-β₂) g_t²
//! 3. m̂_t = m_t / (1-β₁^t), v̂_t = v_t / (1-β₂^t)
//! 4. θ_t = θ_{t-1} - α m̂_t / (√v̂_t + ε)
//!
//! With AMSGrad, step 4 uses the running maximum of v̂ instead.
//!
//! # References
//!
//! - Kingma & Ba, "Adam: A Method for Stochastic Optimization" (2014)
//! - Reddi et al., "On the Convergence of Adam and Beyond" (2018)

use crate::optimizer::{check_gradients, clip_gradient, Optimizer};
use gain_core::error::Result;
use gain_core::types::{constants, Matrix};
use serde::{Deserialize, Serialize};

/// Configuration for the Adam optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    /// Learning rate (α)
    pub learning_rate: f64,
    /// First moment decay rate (β₁)
    pub beta1: f64,
    /// Second moment decay rate (β₂)
    pub beta2: f64,
    /// Small constant for numerical stability (ε)
    pub epsilon: f64,
    /// Whether to use AMSGrad variant
    pub use_amsgrad: bool,
    /// Whether to apply gradient clipping
    pub gradient_clip: Option<f64>,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            use_amsgrad: false,
            gradient_clip: None,
        }
    }
}

impl AdamConfig {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the first moment decay rate (β₁).
    pub fn with_beta1(mut self, beta1: f64) -> Self {
        self.beta1 = beta1;
        self
    }

    /// Sets the second moment decay rate (β₂).
    pub fn with_beta2(mut self, beta2: f64) -> Self {
        self.beta2 = beta2;
        self
    }

    /// Sets the epsilon value for numerical stability.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enables AMSGrad variant.
    pub fn with_amsgrad(mut self) -> Self {
        self.use_amsgrad = true;
        self
    }

    /// Enables gradient clipping with specified threshold.
    pub fn with_gradient_clip(mut self, threshold: f64) -> Self {
        self.gradient_clip = Some(threshold);
        self
    }
}

/// Moment estimates for one parameter matrix.
#[derive(Debug, Clone)]
pub struct AdamState {
    /// First moment estimate (mean of gradients)
    pub m: Matrix,
    /// Second moment estimate (uncentered variance of gradients)
    pub v: Matrix,
    /// Maximum bias-corrected second moment (for AMSGrad)
    pub v_max: Option<Matrix>,
}

impl AdamState {
    /// Zero moments for a parameter of the given shape.
    pub fn zeros(rows: usize, cols: usize, amsgrad: bool) -> Self {
        Self {
            m: Matrix::zeros(rows, cols),
            v: Matrix::zeros(rows, cols),
            v_max: amsgrad.then(|| Matrix::zeros(rows, cols)),
        }
    }
}

/// Adam optimizer.
///
/// # Examples
///
/// ```rust
/// use gain_optim::{Adam, AdamConfig, Optimizer};
/// use nalgebra::DMatrix;
///
/// let mut adam = Adam::new(AdamConfig::new().with_learning_rate(0.1));
/// let mut params = vec![DMatrix::from_element(1, 1, 1.0)];
/// let grads = vec![DMatrix::from_element(1, 1, 2.0)];
/// adam.step(&mut params, &grads).unwrap();
/// assert!(params[0][(0, 0)] < 1.0);
/// ```
#[derive(Debug)]
pub struct Adam {
    config: AdamConfig,
    states: Vec<AdamState>,
    t: usize,
}

impl Adam {
    /// Creates a new Adam optimizer with the given configuration.
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            states: Vec::new(),
            t: 0,
        }
    }

    /// Creates a new Adam optimizer with default configuration.
    pub fn with_default_config() -> Self {
        Self::new(AdamConfig::default())
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Per-parameter moment estimates, empty before the first step.
    pub fn states(&self) -> &[AdamState] {
        &self.states
    }

    fn ensure_states(&mut self, params: &[Matrix]) {
        let layout_changed = self.states.len() != params.len()
            || self
                .states
                .iter()
                .zip(params)
                .any(|(s, p)| s.m.shape() != p.shape());
        if layout_changed {
            if !self.states.is_empty() {
                tracing::warn!("Adam parameter layout changed, resetting moments");
            }
            self.states = params
                .iter()
                .map(|p| AdamState::zeros(p.nrows(), p.ncols(), self.config.use_amsgrad))
                .collect();
            self.t = 0;
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Matrix], grads: &[Matrix]) -> Result<()> {
        check_gradients(params, grads)?;
        self.ensure_states(params);
        self.t += 1;

        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            gradient_clip,
            ..
        } = self.config;
        let t = self.t as i32;
        let bias_correction1 = 1.0 - beta1.powi(t);
        let bias_correction2 = 1.0 - beta2.powi(t);

        for ((param, grad), state) in params.iter_mut().zip(grads).zip(self.states.iter_mut()) {
            let grad = clip_gradient(grad, gradient_clip);

            state.m = &state.m * beta1 + &grad * (1.0 - beta1);
            state.v = &state.v * beta2 + grad.component_mul(&grad) * (1.0 - beta2);

            let m_hat = &state.m / bias_correction1;
            let mut v_hat = &state.v / bias_correction2;
            if let Some(v_max) = state.v_max.as_mut() {
                v_max.zip_apply(&v_hat, |max, v| *max = max.max(v));
                v_hat.copy_from(v_max);
            }

            param.zip_zip_apply(&m_hat, &v_hat, |p, m, v| {
                *p -= learning_rate * m / (v.sqrt() + epsilon);
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        if self.config.use_amsgrad {
            "AMSGrad"
        } else {
            "Adam"
        }
    }

    fn reset(&mut self) {
        self.states.clear();
        self.t = 0;
    }

    fn iterations(&self) -> usize {
        self.t
    }
}
