//! Gradient-based parameter optimizers.
//!
//! Parameters are plain lists of `DMatrix<f64>`; each optimizer keeps its own
//! state per parameter position, so a generator and a discriminator trained
//! side by side each get their own instance.
//!
//! # Available Optimizers
//!
//! - **Adam**: Adaptive moment estimation, with optional AMSGrad
//! - **SGD**: Gradient descent with classical or Nesterov momentum
//!
//! # Examples
//!
//! ```rust
//! use gain_optim::{Adam, AdamConfig, Optimizer};
//! use nalgebra::DMatrix;
//!
//! // Minimise (x - 3)^2
//! let mut adam = Adam::new(AdamConfig::new().with_learning_rate(0.1));
//! let mut params = vec![DMatrix::from_element(1, 1, 0.0)];
//! for _ in 0..500 {
//!     let grads = vec![params[0].map(|x| 2.0 * (x - 3.0))];
//!     adam.step(&mut params, &grads).unwrap();
//! }
//! assert!((params[0][(0, 0)] - 3.0).abs() < 1e-2);
//! ```

pub mod adam;
pub mod optimizer;
pub mod sgd;

// Re-export main optimizers for convenience
pub use adam::{Adam, AdamConfig, AdamState};
pub use optimizer::{check_gradients, clip_gradient, Optimizer};
pub use sgd::{MomentumMethod, SGDConfig, SGD};

use gain_core::config::OptimizerConfig;
use gain_core::error::Result;

/// Builds the optimizer selected in an experiment configuration.
pub fn from_config(config: &OptimizerConfig, learning_rate: f64) -> Result<Box<dyn Optimizer>> {
    Ok(match *config {
        OptimizerConfig::Adam => {
            Box::new(Adam::new(AdamConfig::new().with_learning_rate(learning_rate)))
        }
        OptimizerConfig::Sgd { momentum } => {
            let sgd_config = SGDConfig::new()
                .with_learning_rate(learning_rate)
                .with_classical_momentum(momentum);
            sgd_config.validate()?;
            Box::new(SGD::new(sgd_config))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        let _config = SGDConfig::new();
        let _momentum = MomentumMethod::Classical { coefficient: 0.9 };
        let _adam = AdamConfig::new().with_amsgrad();
    }

    #[test]
    fn test_from_config() {
        let adam = from_config(&OptimizerConfig::Adam, 1e-3).unwrap();
        assert_eq!(adam.name(), "Adam");

        let sgd = from_config(&OptimizerConfig::Sgd { momentum: 0.9 }, 1e-2).unwrap();
        assert_eq!(sgd.name(), "SGD-Momentum");

        assert!(from_config(&OptimizerConfig::Sgd { momentum: 1.5 }, 1e-2).is_err());
    }
}
