//! Callback support for the training loop.
//!
//! Callbacks observe the periodic diagnostics of a run. They are used for
//! console output, collecting loss histories and tests.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Diagnostics recorded every `report_interval` iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Iteration the report was taken at
    pub iteration: usize,
    /// Square root of the reconstruction error on observed cells
    pub train_loss: f64,
    /// Square root of the reconstruction error on masked-out cells
    pub test_loss: f64,
    /// Discriminator cross-entropy
    pub discriminator_loss: f64,
    /// Generator adversarial plus weighted reconstruction loss
    pub generator_loss: f64,
}

/// Ordered sequence of reports from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Reports in iteration order
    pub reports: Vec<TrainingReport>,
}

impl TrainingHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a report.
    pub fn push(&mut self, report: TrainingReport) {
        self.reports.push(report);
    }

    /// Most recent report.
    pub fn last(&self) -> Option<&TrainingReport> {
        self.reports.last()
    }

    /// Number of reports.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether no report was recorded.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Train-loss trajectory.
    pub fn train_losses(&self) -> Vec<f64> {
        self.reports.iter().map(|r| r.train_loss).collect()
    }

    /// Test-loss trajectory.
    pub fn test_losses(&self) -> Vec<f64> {
        self.reports.iter().map(|r| r.test_loss).collect()
    }
}

/// Trait for training callbacks.
pub trait TrainingCallback {
    /// Called once before the first iteration.
    fn on_training_start(&mut self, max_iter: usize) -> Result<()> {
        let _ = max_iter;
        Ok(())
    }

    /// Called for every diagnostics report.
    fn on_report(&mut self, report: &TrainingReport) -> Result<()> {
        let _ = report;
        Ok(())
    }

    /// Called once after the last iteration.
    fn on_training_end(&mut self, history: &TrainingHistory) -> Result<()> {
        let _ = history;
        Ok(())
    }
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TrainingCallback for NoOpCallback {}

/// Prints `Iter`, `Train_loss` and `Test_loss` lines to stdout.
pub struct ConsoleCallback;

impl TrainingCallback for ConsoleCallback {
    fn on_report(&mut self, report: &TrainingReport) -> Result<()> {
        println!("Iter: {}", report.iteration);
        println!("Train_loss: {:.4}", report.train_loss);
        println!("Test_loss: {:.4}", report.test_loss);
        println!();
        Ok(())
    }
}

/// Collects every report it sees.
#[derive(Debug, Default)]
pub struct HistoryCallback {
    /// Reports seen so far
    pub history: TrainingHistory,
}

impl HistoryCallback {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainingCallback for HistoryCallback {
    fn on_report(&mut self, report: &TrainingReport) -> Result<()> {
        self.history.push(*report);
        Ok(())
    }
}
