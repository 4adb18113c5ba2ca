//! Core types for GAIN imputation of spatio-temporal data.
//!
//! This crate holds everything the training loop consumes or produces that
//! is not a network: the 3-D data model and its loader, missingness masks,
//! accuracy metrics, experiment configuration, error types and training
//! callbacks.
//!
//! # Modules
//!
//! - [`callback`]: Training callbacks and loss histories
//! - [`config`]: Experiment configuration
//! - [`data`]: 3-D tensors, unfolding and the dataset loader
//! - [`error`]: Error types
//! - [`mask`]: Observation mask generation
//! - [`metrics`]: MAPE, RMSE and restricted reconstruction errors
//! - [`normalize`]: Column-wise min-max scaling
//! - [`types`]: Type aliases and numerical constants

pub mod callback;
pub mod config;
pub mod data;
pub mod error;
pub mod mask;
pub mod metrics;
pub mod normalize;
pub mod types;

pub use error::{GainError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use gain_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::callback::{
        ConsoleCallback, HistoryCallback, NoOpCallback, TrainingCallback, TrainingHistory,
        TrainingReport,
    };
    pub use crate::config::{GainConfig, HintConfig, OptimizerConfig};
    pub use crate::data::{ArrayDocument, Dataset, Tensor3};
    pub use crate::error::{GainError, Result};
    pub use crate::mask::{
        binary_tensor, complement, observation_mask, sparse_matrix, validate_mask,
        MaskStatistics, MissingScenario,
    };
    pub use crate::metrics::{evaluate, held_out_indices, weighted_mse, ImputationMetrics};
    pub use crate::normalize::MinMaxScaler;
    pub use crate::types::{constants, Matrix, Shape3};
}
