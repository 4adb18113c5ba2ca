//! Generative adversarial imputation of spatio-temporal traffic data.
//!
//! A 3-D traffic tensor `[location, day, time-of-day]` is unfolded into a
//! `[location, day * time]` matrix, a synthetic observation mask hides part
//! of it, and a GAIN generator / discriminator pair is trained to fill the
//! hidden cells. Accuracy is reported as MAPE and RMSE over cells that are
//! present in the data but hidden by the mask.
//!
//! # Crate Structure
//!
//! - `gain-core`: data model, masks, metrics, configuration, errors
//! - `gain-autodiff`: computation graph and reverse-mode gradients
//! - `gain-optim`: Adam and SGD
//! - this crate: networks, hint policies, training loop, pipeline and CLI
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gain::prelude::*;
//!
//! # fn main() -> gain::Result<()> {
//! let dataset = Dataset::synthetic([3, 3, 4], 1000)?;
//! let config = GainConfig::new()
//!     .with_missing_rate(0.2)
//!     .with_alpha(10.0)
//!     .with_max_iter(100);
//!
//! let report = run_experiment(&dataset, &config, &mut ConsoleCallback)?;
//! if let Some(metrics) = report.metrics {
//!     println!("{}", metrics);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod hint;
pub mod network;
pub mod pipeline;
pub mod trainer;

pub use gain_core::{GainError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gain_core::prelude::*;
    pub use gain_optim::{Adam, AdamConfig, MomentumMethod, Optimizer, SGDConfig, SGD};

    pub use crate::hint::{HintPolicy, MaskHint, RandomHint};
    pub use crate::network::{
        compose, Discriminator, Generator, NetworkParameters, OutputActivation, ParameterMode,
    };
    pub use crate::pipeline::{run_experiment, ExperimentReport, ExperimentSummary};
    pub use crate::trainer::{
        discriminator_step, generator_step, GainTrainer, GeneratorLosses, Imputation,
        IterationLosses, TrainingBatch,
    };
}
