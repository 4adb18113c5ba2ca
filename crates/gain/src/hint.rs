//! Hint policies for the discriminator.
//!
//! The hint tells the discriminator part of the true mask. [`MaskHint`]
//! reveals all of it; [`RandomHint`] reveals each cell with probability
//! `hint_rate` and sets the others to 0.5.

use gain_core::config::HintConfig;
use gain_core::error::{GainError, Result};
use gain_core::types::Matrix;
use rand::rngs::StdRng;
use rand::Rng;

/// Produces the hint matrix `H` fed to the discriminator.
pub trait HintPolicy: std::fmt::Debug {
    /// Hint for `mask`. Called once per discriminator and generator step.
    fn hint(&self, mask: &Matrix, rng: &mut StdRng) -> Matrix;

    /// Returns the name of this policy.
    fn name(&self) -> &str;
}

/// `H = M`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskHint;

impl HintPolicy for MaskHint {
    fn hint(&self, mask: &Matrix, _rng: &mut StdRng) -> Matrix {
        mask.clone()
    }

    fn name(&self) -> &str {
        "mask"
    }
}

/// `H = B ⊙ M + 0.5 (1 - B)` with `B ~ Bernoulli(hint_rate)`.
#[derive(Debug, Clone, Copy)]
pub struct RandomHint {
    hint_rate: f64,
}

impl RandomHint {
    /// Creates a random hint revealing each cell with probability `hint_rate`.
    pub fn new(hint_rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&hint_rate) {
            return Err(GainError::invalid_configuration(
                "hint_rate",
                hint_rate,
                "must lie in [0, 1]",
            ));
        }
        Ok(Self { hint_rate })
    }

    /// Probability that a cell reveals its mask value.
    pub fn hint_rate(&self) -> f64 {
        self.hint_rate
    }
}

impl HintPolicy for RandomHint {
    fn hint(&self, mask: &Matrix, rng: &mut StdRng) -> Matrix {
        mask.map(|m| {
            if rng.gen::<f64>() < self.hint_rate {
                m
            } else {
                0.5
            }
        })
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Builds the policy selected in a configuration.
pub fn from_config(config: &HintConfig) -> Result<Box<dyn HintPolicy>> {
    Ok(match *config {
        HintConfig::Mask => Box::new(MaskHint),
        HintConfig::Random { hint_rate } => Box::new(RandomHint::new(hint_rate)?),
    })
}
