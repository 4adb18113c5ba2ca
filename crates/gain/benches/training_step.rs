//! Benchmarks of one full GAIN iteration and of the eager generator pass.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gain::prelude::*;

fn trainer_for(shape: Shape3) -> GainTrainer {
    let dataset = Dataset::synthetic(shape, 1000).unwrap();
    let mat = dataset.matrix().unwrap();
    let mask = observation_mask(&dataset, MissingScenario::Random, 0.2).unwrap();
    GainTrainer::new(mat, mask, GainConfig::new()).unwrap()
}

fn benchmark_training_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("training_step");

    for shape in [[3, 3, 4], [20, 7, 12], [50, 7, 24]] {
        let mut trainer = trainer_for(shape);
        let label = format!("{}x{}x{}", shape[0], shape[1], shape[2]);
        group.bench_with_input(BenchmarkId::new("iteration", &label), &shape, |b, _| {
            b.iter(|| black_box(trainer.step().unwrap()));
        });
    }

    group.finish();
}

fn benchmark_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for shape in [[20, 7, 12], [50, 7, 24]] {
        let trainer = trainer_for(shape);
        let batch = trainer.batch();
        let label = format!("{}x{}x{}", shape[0], shape[1], shape[2]);
        group.bench_with_input(BenchmarkId::new("eager", &label), &shape, |b, _| {
            b.iter(|| {
                trainer
                    .generator()
                    .generate(black_box(batch.observed()), black_box(batch.mask()))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_training_step, benchmark_generate);
criterion_main!(benches);
