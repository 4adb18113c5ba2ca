//! Experiment configuration.
//!
//! A [`GainConfig`] gathers every tunable of a run. It can be built in code
//! with the `with_*` methods or read from a JSON file; missing fields take
//! their defaults.

use crate::error::{GainError, Result};
use crate::mask::{validate_missing_rate, MissingScenario};
use crate::types::constants;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How the hint matrix fed to the discriminator is produced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HintConfig {
    /// `H = M`.
    #[default]
    Mask,
    /// `H = B ⊙ M + 0.5 (1 - B)` with `B ~ Bernoulli(hint_rate)`.
    Random {
        /// Probability that a cell reveals its mask value
        hint_rate: f64,
    },
}

/// Which optimizer updates each network.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OptimizerConfig {
    /// Adam with the standard moment decay rates.
    #[default]
    Adam,
    /// Gradient descent with classical momentum.
    Sgd {
        /// Momentum coefficient in `[0, 1)`
        momentum: f64,
    },
}

/// Configuration of one imputation experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    /// Fraction of cells (or fibres) hidden from the model, in `[0, 1)`
    pub missing_rate: f64,
    /// Missingness policy
    pub missing_scenario: MissingScenario,
    /// Weight of the reconstruction loss
    pub alpha: f64,
    /// Number of training iterations
    pub max_iter: usize,
    /// Iterations between diagnostics
    pub report_interval: usize,
    /// Generator hidden width (`None` = number of columns)
    pub generator_hidden: Option<usize>,
    /// Discriminator hidden width (`None` = number of columns)
    pub discriminator_hidden: Option<usize>,
    /// Learning rate shared by both optimizers
    pub learning_rate: f64,
    /// Optimizer used for both networks
    pub optimizer: OptimizerConfig,
    /// Hint policy
    pub hint: HintConfig,
    /// Seed for parameter initialisation and hint sampling
    pub seed: u64,
    /// Scale each column to `[0, 1]` before training
    pub normalize: bool,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            missing_rate: constants::DEFAULT_MISSING_RATE,
            missing_scenario: MissingScenario::NonRandom,
            alpha: constants::DEFAULT_ALPHA,
            max_iter: constants::DEFAULT_MAX_ITER,
            report_interval: constants::DEFAULT_REPORT_INTERVAL,
            generator_hidden: None,
            discriminator_hidden: None,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            optimizer: OptimizerConfig::Adam,
            hint: HintConfig::Mask,
            seed: constants::DEFAULT_SEED,
            normalize: false,
        }
    }
}

impl GainConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GainError::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| GainError::parse(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the missing rate.
    pub fn with_missing_rate(mut self, missing_rate: f64) -> Self {
        self.missing_rate = missing_rate;
        self
    }

    /// Sets the missingness scenario.
    pub fn with_missing_scenario(mut self, scenario: MissingScenario) -> Self {
        self.missing_scenario = scenario;
        self
    }

    /// Sets the reconstruction loss weight.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the diagnostics interval.
    pub fn with_report_interval(mut self, report_interval: usize) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Sets both hidden widths.
    pub fn with_hidden_width(mut self, width: usize) -> Self {
        self.generator_hidden = Some(width);
        self.discriminator_hidden = Some(width);
        self
    }

    /// Sets the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the optimizer.
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the hint policy.
    pub fn with_hint(mut self, hint: HintConfig) -> Self {
        self.hint = hint;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables column normalisation.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Checks every parameter against its admissible range.
    pub fn validate(&self) -> Result<()> {
        validate_missing_rate(self.missing_rate)?;
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(GainError::invalid_configuration(
                "alpha",
                self.alpha,
                "must be a positive finite number",
            ));
        }
        if self.max_iter == 0 {
            return Err(GainError::invalid_configuration(
                "max_iter",
                self.max_iter,
                "must be positive",
            ));
        }
        if self.report_interval == 0 {
            return Err(GainError::invalid_configuration(
                "report_interval",
                self.report_interval,
                "must be positive",
            ));
        }
        for (name, width) in [
            ("generator_hidden", self.generator_hidden),
            ("discriminator_hidden", self.discriminator_hidden),
        ] {
            if width == Some(0) {
                return Err(GainError::invalid_configuration(name, 0, "must be positive"));
            }
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(GainError::invalid_configuration(
                "learning_rate",
                self.learning_rate,
                "must be a positive finite number",
            ));
        }
        if let OptimizerConfig::Sgd { momentum } = self.optimizer {
            if !(0.0..1.0).contains(&momentum) {
                return Err(GainError::invalid_configuration(
                    "optimizer.momentum",
                    momentum,
                    "must lie in [0, 1)",
                ));
            }
        }
        if let HintConfig::Random { hint_rate } = self.hint {
            if !(0.0..=1.0).contains(&hint_rate) {
                return Err(GainError::invalid_configuration(
                    "hint.hint_rate",
                    hint_rate,
                    "must lie in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}
