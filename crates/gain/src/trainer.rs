//! Adversarial training loop.
//!
//! Every iteration runs one discriminator step followed by one generator
//! step. Each step builds a fresh computation graph in which only the
//! network being updated contributes variables; the other network enters as
//! constants. The step functions take the frozen network by shared reference
//! and the trained one by mutable reference, so a step cannot touch the
//! wrong parameters.

use crate::hint::{self, HintPolicy};
use crate::network::{compose, compose_node, Discriminator, Generator, ParameterMode};
use gain_autodiff::{grad, Graph, GraphExt, NodeId};
use gain_core::callback::{TrainingCallback, TrainingHistory, TrainingReport};
use gain_core::config::GainConfig;
use gain_core::error::{GainError, Result};
use gain_core::mask::{complement, ensure_same_shape, validate_mask, MaskStatistics};
use gain_core::types::{constants::LOG_EPSILON, Matrix};
use gain_optim::Optimizer;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Matrices shared by every step of a run.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    truth: Matrix,
    mask: Matrix,
    not_mask: Matrix,
    observed: Matrix,
    stats: MaskStatistics,
}

impl TrainingBatch {
    /// Pairs the ground truth with its observation mask.
    ///
    /// Fails with `DegenerateMask` when the mask is all-observed or
    /// all-missing, since both training and test losses divide by those
    /// means.
    pub fn new(truth: Matrix, mask: Matrix) -> Result<Self> {
        ensure_same_shape("training mask", &truth, &mask)?;
        let stats = validate_mask(&mask)?;
        let not_mask = complement(&mask);
        let observed = truth.component_mul(&mask);
        Ok(Self {
            truth,
            mask,
            not_mask,
            observed,
            stats,
        })
    }

    /// Ground-truth matrix `X`.
    pub fn truth(&self) -> &Matrix {
        &self.truth
    }

    /// Observation mask `M`.
    pub fn mask(&self) -> &Matrix {
        &self.mask
    }

    /// Generator input `M ⊙ X`.
    pub fn observed(&self) -> &Matrix {
        &self.observed
    }

    /// Observed / missing counts of the mask.
    pub fn stats(&self) -> MaskStatistics {
        self.stats
    }

    /// Number of feature columns.
    pub fn num_col(&self) -> usize {
        self.truth.ncols()
    }
}

/// Losses of one generator step, all taken before the update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorLosses {
    /// `adversarial + alpha * reconstruction`
    pub total: f64,
    /// `-mean((1 - M) log(D + eps))`
    pub adversarial: f64,
    /// `mean((M X - M G)^2) / mean(M)`
    pub reconstruction: f64,
    /// `mean(((1 - M) X - (1 - M) G)^2) / mean(1 - M)`
    pub held_out: f64,
}

/// Losses of one full iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationLosses {
    /// Iteration index, starting at zero
    pub iteration: usize,
    /// Discriminator cross-entropy
    pub discriminator: f64,
    /// Generator losses
    pub generator: GeneratorLosses,
}

impl IterationLosses {
    /// Diagnostics in reporting form: square roots of the two errors.
    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            iteration: self.iteration,
            train_loss: self.generator.reconstruction.sqrt(),
            test_loss: self.generator.held_out.sqrt(),
            discriminator_loss: self.discriminator,
            generator_loss: self.generator.total,
        }
    }
}

/// Raw and mask-composed generator output.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    /// `G(M ⊙ X, M)` as produced by the generator
    pub raw: Matrix,
    /// `M ⊙ X + (1 - M) ⊙ G(M ⊙ X, M)`
    pub composed: Matrix,
}

struct BatchNodes {
    truth: NodeId,
    mask: NodeId,
    not_mask: NodeId,
    observed: NodeId,
    hint: NodeId,
}

impl BatchNodes {
    fn add(graph: &Graph, batch: &TrainingBatch, hint: &Matrix) -> Self {
        Self {
            truth: graph.constant(batch.truth.clone()),
            mask: graph.constant(batch.mask.clone()),
            not_mask: graph.constant(batch.not_mask.clone()),
            observed: graph.constant(batch.observed.clone()),
            hint: graph.constant(hint.clone()),
        }
    }
}

fn ensure_finite(value: f64, iteration: usize, quantity: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GainError::numerical_instability(iteration, quantity))
    }
}

/// One discriminator update with the generator frozen.
///
/// Returns `-mean(M log(D + eps) + (1 - M) log(1 - D + eps))` evaluated
/// before the update.
pub fn discriminator_step(
    generator: &Generator,
    discriminator: &mut Discriminator,
    optimizer: &mut dyn Optimizer,
    batch: &TrainingBatch,
    hint: &Matrix,
    iteration: usize,
) -> Result<f64> {
    ensure_same_shape("hint", &batch.mask, hint)?;
    let graph = Graph::new();
    let nodes = BatchNodes::add(&graph, batch, hint);

    let generated = generator.build(&graph, nodes.observed, nodes.mask, ParameterMode::Frozen);
    let x_hat = compose_node(&graph, nodes.mask, nodes.not_mask, nodes.observed, generated.output);
    let d = discriminator.build(&graph, x_hat, nodes.hint, ParameterMode::Trainable);

    let log_d = graph.log(graph.add_scalar(d.output, LOG_EPSILON));
    let log_not_d = graph.log(graph.add_scalar(graph.neg(d.output), 1.0 + LOG_EPSILON));
    let cross_entropy = graph.add(
        graph.mul(nodes.mask, log_d),
        graph.mul(nodes.not_mask, log_not_d),
    );
    let loss = graph.neg(graph.mean(cross_entropy));

    let value = ensure_finite(graph.forward_scalar(loss)?, iteration, "discriminator loss")?;
    let grads = grad(&graph, loss, &d.parameters)?;
    optimizer.step(discriminator.parameters_mut().as_mut_slice(), &grads)?;
    Ok(value)
}

/// One generator update with the discriminator frozen.
pub fn generator_step(
    generator: &mut Generator,
    discriminator: &Discriminator,
    optimizer: &mut dyn Optimizer,
    batch: &TrainingBatch,
    hint: &Matrix,
    alpha: f64,
    iteration: usize,
) -> Result<GeneratorLosses> {
    ensure_same_shape("hint", &batch.mask, hint)?;
    let graph = Graph::new();
    let nodes = BatchNodes::add(&graph, batch, hint);

    let g = generator.build(&graph, nodes.observed, nodes.mask, ParameterMode::Trainable);
    let x_hat = compose_node(&graph, nodes.mask, nodes.not_mask, nodes.observed, g.output);
    let d = discriminator.build(&graph, x_hat, nodes.hint, ParameterMode::Frozen);

    let log_d = graph.log(graph.add_scalar(d.output, LOG_EPSILON));
    let adversarial = graph.neg(graph.mean(graph.mul(nodes.not_mask, log_d)));

    let restricted_error = |weights: NodeId, weight_mean: f64| {
        let diff = graph.sub(
            graph.mul(weights, nodes.truth),
            graph.mul(weights, g.output),
        );
        graph.scale(graph.mean(graph.pow(diff, 2.0)), 1.0 / weight_mean)
    };
    let reconstruction = restricted_error(nodes.mask, batch.stats.observed_ratio());
    let held_out = restricted_error(nodes.not_mask, batch.stats.missing_ratio());

    let loss = graph.add(adversarial, graph.scale(reconstruction, alpha));

    let losses = GeneratorLosses {
        total: ensure_finite(graph.forward_scalar(loss)?, iteration, "generator loss")?,
        adversarial: graph.forward_scalar(adversarial)?,
        reconstruction: graph.forward_scalar(reconstruction)?,
        held_out: ensure_finite(graph.forward_scalar(held_out)?, iteration, "test loss")?,
    };
    let grads = grad(&graph, loss, &g.parameters)?;
    optimizer.step(generator.parameters_mut().as_mut_slice(), &grads)?;
    Ok(losses)
}

/// Owns both networks, their optimizers and the sampling state of a run.
#[derive(Debug)]
pub struct GainTrainer {
    config: GainConfig,
    batch: TrainingBatch,
    generator: Generator,
    discriminator: Discriminator,
    generator_optimizer: Box<dyn Optimizer>,
    discriminator_optimizer: Box<dyn Optimizer>,
    hint_policy: Box<dyn HintPolicy>,
    rng: StdRng,
    iteration: usize,
}

impl GainTrainer {
    /// Initialises both networks from `config.seed`.
    pub fn new(truth: Matrix, mask: Matrix, config: GainConfig) -> Result<Self> {
        config.validate()?;
        let batch = TrainingBatch::new(truth, mask)?;
        let num_col = batch.num_col();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let generator = Generator::new(num_col, config.generator_hidden, &mut rng)?;
        let discriminator = Discriminator::new(num_col, config.discriminator_hidden, &mut rng)?;

        Ok(Self {
            generator_optimizer: gain_optim::from_config(&config.optimizer, config.learning_rate)?,
            discriminator_optimizer: gain_optim::from_config(&config.optimizer, config.learning_rate)?,
            hint_policy: hint::from_config(&config.hint)?,
            config,
            batch,
            generator,
            discriminator,
            rng,
            iteration: 0,
        })
    }

    /// Replaces the hint policy chosen by the configuration.
    pub fn with_hint_policy(mut self, policy: Box<dyn HintPolicy>) -> Self {
        self.hint_policy = policy;
        self
    }

    /// Replaces both optimizers.
    pub fn with_optimizers(
        mut self,
        generator: Box<dyn Optimizer>,
        discriminator: Box<dyn Optimizer>,
    ) -> Self {
        self.generator_optimizer = generator;
        self.discriminator_optimizer = discriminator;
        self
    }

    /// Samples the hint for the next step.
    pub fn next_hint(&mut self) -> Matrix {
        self.hint_policy.hint(&self.batch.mask, &mut self.rng)
    }

    /// Updates the discriminator once against the current generator.
    pub fn discriminator_step(&mut self, hint: &Matrix) -> Result<f64> {
        discriminator_step(
            &self.generator,
            &mut self.discriminator,
            self.discriminator_optimizer.as_mut(),
            &self.batch,
            hint,
            self.iteration,
        )
    }

    /// Updates the generator once against the current discriminator.
    pub fn generator_step(&mut self, hint: &Matrix) -> Result<GeneratorLosses> {
        generator_step(
            &mut self.generator,
            &self.discriminator,
            self.generator_optimizer.as_mut(),
            &self.batch,
            hint,
            self.config.alpha,
            self.iteration,
        )
    }

    /// Runs one full iteration and advances the counter.
    pub fn step(&mut self) -> Result<IterationLosses> {
        let hint = self.next_hint();
        let discriminator = self.discriminator_step(&hint)?;
        let generator = self.generator_step(&hint)?;
        let losses = IterationLosses {
            iteration: self.iteration,
            discriminator,
            generator,
        };
        self.iteration += 1;
        Ok(losses)
    }

    /// Runs `max_iter` iterations, reporting at iteration 0 and every
    /// `report_interval` iterations after it.
    pub fn train(&mut self, callback: &mut dyn TrainingCallback) -> Result<TrainingHistory> {
        let max_iter = self.config.max_iter;
        let report_interval = self.config.report_interval;
        let stats = self.batch.stats;

        tracing::info!(
            max_iter,
            alpha = self.config.alpha,
            observed = stats.observed,
            missing = stats.missing,
            hint = self.hint_policy.name(),
            optimizer = self.generator_optimizer.name(),
            "starting GAIN training"
        );
        callback.on_training_start(max_iter)?;

        let mut history = TrainingHistory::new();
        for it in 0..max_iter {
            let losses = self.step().map_err(|err| {
                tracing::error!(iteration = self.iteration, error = %err, "training aborted");
                err
            })?;
            if it % report_interval == 0 {
                let report = losses.report();
                tracing::debug!(
                    iteration = report.iteration,
                    train_loss = report.train_loss,
                    test_loss = report.test_loss,
                    discriminator_loss = report.discriminator_loss,
                    generator_loss = report.generator_loss,
                    "training report"
                );
                callback.on_report(&report)?;
                history.push(report);
            }
        }

        if let Some(last) = history.last() {
            tracing::info!(
                iterations = self.iteration,
                train_loss = last.train_loss,
                test_loss = last.test_loss,
                "GAIN training finished"
            );
        }
        callback.on_training_end(&history)?;
        Ok(history)
    }

    /// Final sample `G(M ⊙ X, M)` and its composition with the observed data.
    ///
    /// A non-finite sample (a generator that diverged on its last update) is
    /// an error rather than an imputation.
    pub fn impute(&self) -> Result<Imputation> {
        let raw = self.generator.generate(&self.batch.observed, &self.batch.mask)?;
        if raw.iter().any(|v| !v.is_finite()) {
            tracing::error!(iteration = self.iteration, "generator sample is not finite");
            return Err(GainError::numerical_instability(
                self.iteration,
                "final generator sample",
            ));
        }
        let composed = compose(&self.batch.mask, &self.batch.truth, &raw)?;
        Ok(Imputation { raw, composed })
    }

    /// The generator.
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// The discriminator.
    pub fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    /// Training data and mask.
    pub fn batch(&self) -> &TrainingBatch {
        &self.batch
    }

    /// The run configuration.
    pub fn config(&self) -> &GainConfig {
        &self.config
    }

    /// Number of completed iterations.
    pub fn iteration(&self) -> usize {
        self.iteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::RandomHint;
    use gain_core::callback::{HistoryCallback, NoOpCallback};
    use gain_optim::{SGDConfig, SGD};

    fn toy() -> (Matrix, Matrix) {
        let truth = Matrix::from_fn(6, 4, |i, j| 1.0 + 0.1 * i as f64 + 0.05 * j as f64);
        let mask = Matrix::from_fn(6, 4, |i, j| if (i + j) % 3 == 0 { 0.0 } else { 1.0 });
        (truth, mask)
    }

    fn config() -> GainConfig {
        GainConfig::new().with_max_iter(20).with_report_interval(5).with_seed(11)
    }

    #[test]
    fn test_degenerate_masks_rejected() {
        let (truth, _) = toy();
        for mask in [Matrix::zeros(6, 4), Matrix::from_element(6, 4, 1.0)] {
            assert!(matches!(
                GainTrainer::new(truth.clone(), mask, config()),
                Err(GainError::DegenerateMask { .. })
            ));
        }
    }

    #[test]
    fn test_mask_shape_checked() {
        let (truth, _) = toy();
        assert!(matches!(
            TrainingBatch::new(truth, Matrix::zeros(2, 2)),
            Err(GainError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_discriminator_step_leaves_generator() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config()).unwrap();
        let generator_before = trainer.generator().clone();
        let discriminator_before = trainer.discriminator().clone();

        let hint = trainer.next_hint();
        let loss = trainer.discriminator_step(&hint).unwrap();

        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(trainer.generator(), &generator_before);
        assert_ne!(trainer.discriminator(), &discriminator_before);
    }

    #[test]
    fn test_generator_step_leaves_discriminator() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config()).unwrap();
        let generator_before = trainer.generator().clone();
        let discriminator_before = trainer.discriminator().clone();

        let hint = trainer.next_hint();
        let losses = trainer.generator_step(&hint).unwrap();

        assert!(losses.total.is_finite());
        assert!(losses.reconstruction >= 0.0 && losses.held_out >= 0.0);
        assert_eq!(trainer.discriminator(), &discriminator_before);
        assert_ne!(trainer.generator(), &generator_before);
    }

    #[test]
    fn test_total_combines_terms() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config().with_alpha(7.0)).unwrap();
        let hint = trainer.next_hint();
        let losses = trainer.generator_step(&hint).unwrap();
        approx::assert_relative_eq!(
            losses.total,
            losses.adversarial + 7.0 * losses.reconstruction,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_reconstruction_matches_metric() {
        // The graph's reconstruction error equals weighted_mse on the eager output.
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth.clone(), mask.clone(), config()).unwrap();
        let raw = trainer.impute().unwrap().raw;
        let hint = trainer.next_hint();
        let losses = trainer.generator_step(&hint).unwrap();

        let expected = gain_core::metrics::weighted_mse(&truth, &raw, &mask).unwrap();
        approx::assert_relative_eq!(losses.reconstruction, expected, epsilon = 1e-10);
        let held_out = gain_core::metrics::weighted_mse(&truth, &raw, &complement(&mask)).unwrap();
        approx::assert_relative_eq!(losses.held_out, held_out, epsilon = 1e-10);
    }

    #[test]
    fn test_train_reports_on_schedule() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config()).unwrap();
        let mut callback = HistoryCallback::new();

        let history = trainer.train(&mut callback).unwrap();

        let iterations: Vec<usize> = history.reports.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![0, 5, 10, 15]);
        assert_eq!(callback.history, history);
        assert_eq!(trainer.iteration(), 20);
    }

    #[test]
    fn test_random_hint_and_sgd() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config())
            .unwrap()
            .with_hint_policy(Box::new(RandomHint::new(0.9).unwrap()))
            .with_optimizers(
                Box::new(SGD::new(SGDConfig::new().with_learning_rate(0.01))),
                Box::new(SGD::new(SGDConfig::new().with_learning_rate(0.01))),
            );
        let history = trainer.train(&mut NoOpCallback).unwrap();
        assert!(history.reports.iter().all(|r| r.train_loss.is_finite()));
    }

    #[test]
    fn test_non_finite_loss_aborts() {
        let (mut truth, mask) = toy();
        truth[(1, 1)] = f64::NAN;
        let mut trainer = GainTrainer::new(truth, mask, config()).unwrap();
        let result = trainer.train(&mut NoOpCallback);
        assert!(matches!(
            result,
            Err(GainError::NumericalInstability { iteration: 0, .. })
        ));
    }

    #[test]
    fn test_diverged_generator_sample_is_reported() {
        let (truth, mask) = toy();
        let mut trainer = GainTrainer::new(truth, mask, config().with_max_iter(1))
            .unwrap()
            .with_optimizers(
                Box::new(SGD::new(SGDConfig::new().with_learning_rate(1e300))),
                Box::new(SGD::new(SGDConfig::new().with_learning_rate(1e-9))),
            );
        trainer.train(&mut NoOpCallback).unwrap();
        assert!(matches!(
            trainer.impute(),
            Err(GainError::NumericalInstability { iteration: 1, ref quantity }) if quantity == "final generator sample"
        ));
    }

    #[test]
    fn test_impute_composes_observed_cells() {
        let (truth, mask) = toy();
        let trainer = GainTrainer::new(truth.clone(), mask.clone(), config()).unwrap();
        let imputation = trainer.impute().unwrap();
        for ((c, r), (t, m)) in imputation
            .composed
            .iter()
            .zip(imputation.raw.iter())
            .zip(truth.iter().zip(mask.iter()))
        {
            if *m == 1.0 {
                assert_eq!(c, t);
            } else {
                assert_eq!(c, r);
            }
        }
    }
}
