//! End-to-end experiment: mask, train, impute, evaluate.

use crate::network::compose;
use crate::trainer::{GainTrainer, Imputation};
use gain_core::callback::{TrainingCallback, TrainingHistory};
use gain_core::config::GainConfig;
use gain_core::data::Dataset;
use gain_core::error::{GainError, Result};
use gain_core::mask::{observation_mask, sparse_matrix, validate_mask, MaskStatistics};
use gain_core::metrics::{evaluate, ImputationMetrics};
use gain_core::normalize::MinMaxScaler;
use gain_core::types::Matrix;
use serde::{Deserialize, Serialize};

/// Everything produced by one experiment.
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    /// Periodic training diagnostics
    pub history: TrainingHistory,
    /// Observed / missing counts of the synthetic mask
    pub mask_stats: MaskStatistics,
    /// Final generator sample, raw and composed, in data units
    pub imputation: Imputation,
    /// Metrics of the composed imputation (`None` without held-out cells)
    pub metrics: Option<ImputationMetrics>,
    /// Metrics of the raw generator output (`None` without held-out cells)
    pub raw_metrics: Option<ImputationMetrics>,
}

impl ExperimentReport {
    /// Serializable digest without the matrices.
    pub fn summary(&self) -> ExperimentSummary {
        ExperimentSummary {
            observed: self.mask_stats.observed,
            missing: self.mask_stats.missing,
            history: self.history.clone(),
            metrics: self.metrics,
            raw_metrics: self.raw_metrics,
        }
    }
}

/// JSON-friendly view of an [`ExperimentReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Observed cells in the mask
    pub observed: usize,
    /// Missing cells in the mask
    pub missing: usize,
    /// Training diagnostics
    pub history: TrainingHistory,
    /// Metrics of the composed imputation
    pub metrics: Option<ImputationMetrics>,
    /// Metrics of the raw generator output
    pub raw_metrics: Option<ImputationMetrics>,
}

/// Metrics over held-out cells, or `None` when there are none.
fn held_out_metrics(
    truth: &Matrix,
    pred: &Matrix,
    sparse: &Matrix,
) -> Result<Option<ImputationMetrics>> {
    match evaluate(truth, pred, sparse) {
        Ok(metrics) => Ok(Some(metrics)),
        Err(GainError::NoHeldOutCells) => {
            tracing::warn!("no held-out cells; imputation metrics are undefined");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Runs the whole experiment on `dataset`.
pub fn run_experiment(
    dataset: &Dataset,
    config: &GainConfig,
    callback: &mut dyn TrainingCallback,
) -> Result<ExperimentReport> {
    config.validate()?;

    let mat = dataset.matrix()?;
    let mask = observation_mask(dataset, config.missing_scenario, config.missing_rate)?;
    let sparse = sparse_matrix(&mat, &mask)?;
    let mask_stats = validate_mask(&mask)?;
    tracing::info!(
        rows = mat.nrows(),
        cols = mat.ncols(),
        scenario = %config.missing_scenario,
        missing_rate = config.missing_rate,
        %mask_stats,
        "prepared observation mask"
    );

    let scaler = if config.normalize {
        Some(MinMaxScaler::fit(&mat, &mask)?)
    } else {
        None
    };
    let training_data = match &scaler {
        Some(scaler) => scaler.transform(&mat),
        None => mat.clone(),
    };

    let mut trainer = GainTrainer::new(training_data, mask.clone(), config.clone())?;
    let history = trainer.train(callback)?;

    let imputation = match &scaler {
        Some(scaler) => {
            let raw = scaler.inverse_transform(&trainer.impute()?.raw);
            let composed = compose(&mask, &mat, &raw)?;
            Imputation { raw, composed }
        }
        None => trainer.impute()?,
    };

    let metrics = held_out_metrics(&mat, &imputation.composed, &sparse)?;
    let raw_metrics = held_out_metrics(&mat, &imputation.raw, &sparse)?;
    if let Some(m) = &metrics {
        tracing::info!(mape = m.mape, rmse = m.rmse, cells = m.count, "evaluated imputation");
    }

    Ok(ExperimentReport {
        history,
        mask_stats,
        imputation,
        metrics,
        raw_metrics,
    })
}
