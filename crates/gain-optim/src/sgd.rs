//! Gradient descent with optional momentum.
//!
//! # Algorithm Overview
//!
//! Each step moves every parameter against its gradient:
//! 1. Clip the gradient if a threshold is configured
//! 2. Update the velocity if momentum is enabled
//! 3. Take a step `θ <- θ - lr * direction`
//!
//! # Features
//!
//! - **Momentum methods**: Classical momentum and Nesterov acceleration
//! - **Gradient clipping**: Prevents exploding gradients

use crate::optimizer::{check_gradients, clip_gradient, Optimizer};
use gain_core::error::{GainError, Result};
use gain_core::types::{constants, Matrix};
use serde::{Deserialize, Serialize};

/// Momentum method for SGD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MomentumMethod {
    /// No momentum
    None,

    /// Classical momentum: v_k = beta*v_{k-1} + grad_k
    Classical {
        coefficient: f64,
    },

    /// Nesterov accelerated gradient
    Nesterov {
        coefficient: f64,
    },
}

impl MomentumMethod {
    fn coefficient(&self) -> Option<f64> {
        match *self {
            MomentumMethod::None => None,
            MomentumMethod::Classical { coefficient } | MomentumMethod::Nesterov { coefficient } => {
                Some(coefficient)
            }
        }
    }
}

/// Configuration for the SGD optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SGDConfig {
    /// Constant step size
    pub learning_rate: f64,

    /// Momentum method
    pub momentum: MomentumMethod,

    /// Gradient clipping threshold (None = no clipping)
    pub gradient_clip: Option<f64>,
}

impl Default for SGDConfig {
    fn default() -> Self {
        Self {
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            momentum: MomentumMethod::None,
            gradient_clip: None,
        }
    }
}

impl SGDConfig {
    /// Creates a new SGD configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step size.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets momentum method.
    pub fn with_momentum(mut self, momentum: MomentumMethod) -> Self {
        self.momentum = momentum;
        self
    }

    /// Sets classical momentum.
    pub fn with_classical_momentum(mut self, coefficient: f64) -> Self {
        self.momentum = MomentumMethod::Classical { coefficient };
        self
    }

    /// Sets Nesterov momentum.
    pub fn with_nesterov_momentum(mut self, coefficient: f64) -> Self {
        self.momentum = MomentumMethod::Nesterov { coefficient };
        self
    }

    /// Sets gradient clipping threshold.
    pub fn with_gradient_clip(mut self, threshold: f64) -> Self {
        self.gradient_clip = Some(threshold);
        self
    }

    /// Checks the step size and momentum coefficient.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(GainError::invalid_configuration(
                "learning_rate",
                self.learning_rate,
                "must be positive and finite",
            ));
        }
        if let Some(coefficient) = self.momentum.coefficient() {
            if !(0.0..1.0).contains(&coefficient) {
                return Err(GainError::invalid_configuration(
                    "momentum",
                    coefficient,
                    "must lie in [0, 1)",
                ));
            }
        }
        Ok(())
    }
}

/// Stochastic gradient descent optimizer.
///
/// # Examples
///
/// ```rust
/// use gain_optim::{Optimizer, SGDConfig, SGD};
/// use nalgebra::DMatrix;
///
/// let mut sgd = SGD::new(SGDConfig::new().with_learning_rate(0.5));
/// let mut params = vec![DMatrix::from_element(1, 1, 1.0)];
/// sgd.step(&mut params, &[DMatrix::from_element(1, 1, 1.0)]).unwrap();
/// assert_eq!(params[0][(0, 0)], 0.5);
/// ```
#[derive(Debug)]
pub struct SGD {
    config: SGDConfig,
    velocities: Vec<Matrix>,
    iterations: usize,
}

impl SGD {
    /// Creates a new SGD optimizer with the given configuration.
    pub fn new(config: SGDConfig) -> Self {
        Self {
            config,
            velocities: Vec::new(),
            iterations: 0,
        }
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &SGDConfig {
        &self.config
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [Matrix], grads: &[Matrix]) -> Result<()> {
        check_gradients(params, grads)?;

        let lr = self.config.learning_rate;
        let momentum = self.config.momentum;

        if momentum.coefficient().is_some()
            && (self.velocities.len() != params.len()
                || self.velocities.iter().zip(params.iter()).any(|(v, p)| v.shape() != p.shape()))
        {
            self.velocities = params.iter().map(|p| Matrix::zeros(p.nrows(), p.ncols())).collect();
        }

        for (index, (param, grad)) in params.iter_mut().zip(grads).enumerate() {
            let grad = clip_gradient(grad, self.config.gradient_clip);

            let direction = match momentum {
                MomentumMethod::None => grad,
                MomentumMethod::Classical { coefficient } => {
                    let velocity = &mut self.velocities[index];
                    *velocity = &*velocity * coefficient + &grad;
                    velocity.clone()
                }
                MomentumMethod::Nesterov { coefficient } => {
                    let velocity = &mut self.velocities[index];
                    *velocity = &*velocity * coefficient + &grad;
                    &grad + &*velocity * coefficient
                }
            };

            *param -= direction * lr;
        }

        self.iterations += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        match self.config.momentum {
            MomentumMethod::None => "SGD",
            MomentumMethod::Classical { .. } => "SGD-Momentum",
            MomentumMethod::Nesterov { .. } => "SGD-Nesterov",
        }
    }

    fn reset(&mut self) {
        self.velocities.clear();
        self.iterations = 0;
    }

    fn iterations(&self) -> usize {
        self.iterations
    }
}
