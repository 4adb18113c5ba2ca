//! Command-line interface of the `gain` binary.
//!
//! # Usage
//!
//! ```bash
//! # Train on stored arrays
//! gain run --tensor tensor.json --random-matrix rm.json --random-tensor rt.json
//!
//! # Train on a synthetic tensor with overrides
//! gain run --synthetic 3,3,4 --missing-rate 0.2 --alpha 10 --max-iter 100
//!
//! # Inspect the mask a configuration would produce
//! gain mask-stats --synthetic 30,7,24 --scenario random
//! ```

use crate::pipeline::run_experiment;
use clap::{Args, Parser, Subcommand};
use gain_core::callback::{ConsoleCallback, NoOpCallback, TrainingCallback};
use gain_core::config::{GainConfig, HintConfig};
use gain_core::data::Dataset;
use gain_core::error::{GainError, Result};
use gain_core::mask::{validate_missing_rate, MaskStatistics, MissingScenario};
use gain_core::types::Shape3;
use std::fs;
use std::path::PathBuf;

/// GAIN: generative adversarial imputation of spatio-temporal data
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "gain")]
#[command(version)]
#[command(about = "Impute missing traffic data with a generative adversarial imputation network")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train GAIN and report MAPE / RMSE on the held-out cells
    Run(RunArgs),

    /// Print observed / missing counts of the synthetic mask
    MaskStats(MaskStatsArgs),
}

/// Where the ground truth and random inputs come from.
#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct DataArgs {
    /// Ground-truth 3-D tensor (JSON array document)
    #[arg(long, requires_all = ["random_matrix", "random_tensor"])]
    pub tensor: Option<PathBuf>,

    /// Random matrix of shape [dim0, dim1]
    #[arg(long)]
    pub random_matrix: Option<PathBuf>,

    /// Random tensor of the ground-truth shape
    #[arg(long)]
    pub random_tensor: Option<PathBuf>,

    /// Use a synthetic tensor of shape D0,D1,D2 instead of files
    #[arg(long, value_parser = parse_shape, conflicts_with_all = ["tensor", "random_matrix", "random_tensor"])]
    pub synthetic: Option<Shape3>,
}

impl DataArgs {
    /// Loads the dataset; synthetic data is seeded with `seed`.
    pub fn load(&self, seed: u64) -> Result<Dataset> {
        if let Some(shape) = self.synthetic {
            return Dataset::synthetic(shape, seed);
        }
        match (&self.tensor, &self.random_matrix, &self.random_tensor) {
            (Some(tensor), Some(random_matrix), Some(random_tensor)) => {
                Dataset::load(tensor, random_matrix, random_tensor)
            }
            _ => Err(GainError::invalid_configuration(
                "data",
                "none",
                "pass --synthetic or all of --tensor, --random-matrix and --random-tensor",
            )),
        }
    }
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct RunArgs {
    /// Input data
    #[command(flatten)]
    pub data: DataArgs,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fraction of cells or fibres to hide, in [0, 1)
    #[arg(long)]
    pub missing_rate: Option<f64>,

    /// Missingness scenario: random or non-random
    #[arg(long)]
    pub scenario: Option<MissingScenario>,

    /// Reconstruction loss weight
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Number of training iterations
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Iterations between loss reports
    #[arg(long)]
    pub report_interval: Option<usize>,

    /// Hidden width of both networks
    #[arg(long)]
    pub hidden: Option<usize>,

    /// Learning rate of both optimizers
    #[arg(long)]
    pub lr: Option<f64>,

    /// Use the random hint with this hint rate instead of H = M
    #[arg(long)]
    pub hint_rate: Option<f64>,

    /// Seed for initialisation, hints and synthetic data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Min-max scale columns before training
    #[arg(long)]
    pub normalize: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Do not print periodic losses
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the mask-stats command
#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct MaskStatsArgs {
    /// Input data
    #[command(flatten)]
    pub data: DataArgs,

    /// Fraction of cells or fibres to hide, in [0, 1)
    #[arg(long, default_value_t = gain_core::types::constants::DEFAULT_MISSING_RATE)]
    pub missing_rate: f64,

    /// Missingness scenario: random or non-random
    #[arg(long, default_value_t = MissingScenario::NonRandom)]
    pub scenario: MissingScenario,

    /// Seed for synthetic data
    #[arg(long, default_value_t = gain_core::types::constants::DEFAULT_SEED)]
    pub seed: u64,
}

/// Parses `D0,D1,D2`.
pub fn parse_shape(s: &str) -> std::result::Result<Shape3, String> {
    let dims = s
        .split(',')
        .map(|d| d.trim().parse::<usize>().map_err(|e| format!("invalid dimension `{}`: {}", d, e)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match dims.as_slice() {
        [d0, d1, d2] if *d0 > 0 && *d1 > 0 && *d2 > 0 => Ok([*d0, *d1, *d2]),
        [_, _, _] => Err("dimensions must be positive".to_string()),
        _ => Err(format!("expected three comma-separated dimensions, got `{}`", s)),
    }
}

/// Parses arguments, for tests and embedding.
pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Builds the run configuration: defaults, then the config file, then flags.
pub fn apply_overrides(args: &RunArgs) -> Result<GainConfig> {
    let mut config = match &args.config {
        Some(path) => GainConfig::from_json_file(path)?,
        None => GainConfig::default(),
    };

    if let Some(missing_rate) = args.missing_rate {
        config.missing_rate = missing_rate;
    }
    if let Some(scenario) = args.scenario {
        config.missing_scenario = scenario;
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(max_iter) = args.max_iter {
        config.max_iter = max_iter;
    }
    if let Some(report_interval) = args.report_interval {
        config.report_interval = report_interval;
    }
    if let Some(hidden) = args.hidden {
        config = config.with_hidden_width(hidden);
    }
    if let Some(lr) = args.lr {
        config.learning_rate = lr;
    }
    if let Some(hint_rate) = args.hint_rate {
        config.hint = HintConfig::Random { hint_rate };
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.normalize {
        config.normalize = true;
    }

    config.validate()?;
    Ok(config)
}

/// Executes a parsed command.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => run(&args),
        Command::MaskStats(args) => mask_stats(&args),
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let config = apply_overrides(args)?;
    let dataset = args.data.load(config.seed)?;

    let mut console = ConsoleCallback;
    let mut silent = NoOpCallback;
    let callback: &mut dyn TrainingCallback = if args.quiet { &mut silent } else { &mut console };

    let report = run_experiment(&dataset, &config, callback)?;
    match &report.metrics {
        Some(metrics) => println!("{}", metrics),
        None => println!("no held-out cells"),
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report.summary()).map_err(|e| GainError::parse(path, e))?;
        fs::write(path, json).map_err(|e| GainError::io(path, e))?;
        tracing::info!(path = %path.display(), "wrote run summary");
    }
    Ok(())
}

fn mask_stats(args: &MaskStatsArgs) -> Result<()> {
    validate_missing_rate(args.missing_rate)?;
    let dataset = args.data.load(args.seed)?;
    let mask = gain_core::mask::observation_mask(&dataset, args.scenario, args.missing_rate)?;
    let stats = MaskStatistics::from_mask(&mask);
    println!("shape = [{}, {}]", mask.nrows(), mask.ncols());
    println!("{}", stats);
    Ok(())
}
