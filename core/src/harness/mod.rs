//! Times each aggregation strategy over repeated runs on one dataset.

pub mod stats;


use std::collections::BTreeMap;
use std::hint::black_box;
use std::time::{Duration, Instant};

use anyhow::anyhow;

use crate::aggregate::{AggregateError, AggregateOptions, CaseMatch, Strategy, diffs_close};
use crate::dataset::Dataset;

pub use stats::TimingSummary;

pub const DEFAULT_ITERATIONS: usize = 10;
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct BenchOptions {
    pub iterations: usize,
    /// Untimed runs per strategy before measuring.
    pub warmup: usize,
    pub strategies: Vec<Strategy>,
    pub aggregate: AggregateOptions,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            warmup: 0,
            strategies: Strategy::ALL.to_vec(),
            aggregate: AggregateOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyTimings {
    pub strategy: Strategy,
    pub samples: Vec<Duration>,
}

impl StrategyTimings {
    pub fn summary(&self) -> TimingSummary {
        TimingSummary::from_samples(&self.samples)
    }
}

/// Wall-clock samples per strategy, in the order the strategies ran.
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub iterations: usize,
    pub timings: Vec<StrategyTimings>,
}

impl BenchReport {
    pub fn samples(&self, strategy: Strategy) -> Option<&[Duration]> {
        self.timings
            .iter()
            .find(|t| t.strategy == strategy)
            .map(|t| t.samples.as_slice())
    }

    /// Strategy name -> ordered samples.
    pub fn by_name(&self) -> BTreeMap<&'static str, &[Duration]> {
        self.timings
            .iter()
            .map(|t| (t.strategy.key(), t.samples.as_slice()))
            .collect()
    }
}

pub fn run_benchmark(dataset: &Dataset, opts: &BenchOptions) -> Result<BenchReport, AggregateError> {
    if opts.iterations == 0 {
        return Err(AggregateError::InvalidIterations);
    }
    if opts.aggregate.case_match == CaseMatch::Substring && opts.strategies.contains(&Strategy::RecordList) {
        tracing::warn!("record_list uses substring case matching; contained case names will share rows");
    }

    let mut timings = Vec::with_capacity(opts.strategies.len());
    for &strategy in &opts.strategies {
        for _ in 0..opts.warmup {
            black_box(strategy.run(black_box(dataset), &opts.aggregate)?);
        }

        let mut samples = Vec::with_capacity(opts.iterations);
        for iteration in 0..opts.iterations {
            let start = Instant::now();
            let diffs = strategy.run(black_box(dataset), &opts.aggregate)?;
            let elapsed = start.elapsed();
            black_box(diffs);
            tracing::debug!(strategy = strategy.key(), iteration, elapsed_ns = elapsed.as_nanos() as u64, "run");
            samples.push(elapsed);
        }

        let timings_for = StrategyTimings { strategy, samples };
        let summary = timings_for.summary();
        tracing::info!(
            strategy = strategy.key(),
            runs = summary.runs,
            mean = %stats::format_ns(summary.mean_ns),
            median = %stats::format_ns(summary.median_ns),
            "strategy timed"
        );
        timings.push(timings_for);
    }

    Ok(BenchReport {
        iterations: opts.iterations,
        timings,
    })
}

/// Check every strategy against the grouped-reduction reference.
///
/// The nested-loop strategy averages per-repetition differences, so it only
/// agrees on fixtures where cases and baseline share their repetition layout.
pub fn verify_agreement(
    dataset: &Dataset,
    strategies: &[Strategy],
    opts: &AggregateOptions,
    tolerance: f64,
) -> anyhow::Result<()> {
    let reference = Strategy::GroupAggregate.run(dataset, opts)?;
    for &strategy in strategies {
        if strategy == Strategy::GroupAggregate {
            continue;
        }
        let diffs = strategy.run(dataset, opts)?;
        if !diffs_close(&reference, &diffs, tolerance) {
            return Err(anyhow!(
                "{} disagrees with {} beyond tolerance {}: expected {:?} but observed {:?}",
                strategy,
                Strategy::GroupAggregate,
                tolerance,
                reference,
                diffs
            ));
        }
        tracing::debug!(strategy = strategy.key(), cases = diffs.len(), "strategy agrees with reference");
    }
    Ok(())
}
