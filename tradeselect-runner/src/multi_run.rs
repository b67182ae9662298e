//! Repeated independent annealing trials with one fixed configuration.
//!
//! Trial `r` draws from the `("multi_run", r)` stream of the seed
//! hierarchy, so the best-of-N answer depends only on the master seed and
//! N, never on how trials were scheduled across threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradeselect_core::annealing::{AnnealingOutcome, SimulatedAnnealing, Termination};
use tradeselect_core::{OptimizeError, RngHierarchy, TradeLedger};

/// RNG scope for repeated trials.
pub const MULTI_RUN_SCOPE: &str = "multi_run";

#[derive(Debug, Error)]
pub enum MultiRunError {
    #[error("num_runs must be at least 1")]
    NoRuns,
    #[error("run {run} (seed {seed}) failed: {source}")]
    Run {
        run: usize,
        seed: u64,
        #[source]
        source: OptimizeError,
    },
}

/// Per-trial summary kept for every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub run: usize,
    pub seed: u64,
    pub best_profit: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Outcome of a multi-run batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiRunOutcome {
    /// Index of the winning trial; ties go to the lowest index.
    pub best_run: usize,
    pub best: AnnealingOutcome,
    pub trials: Vec<TrialSummary>,
}

impl MultiRunOutcome {
    pub fn best_profit(&self) -> f64 {
        self.best.best_profit()
    }

    pub fn run_profits(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.best_profit).collect()
    }

    pub fn mean_profit(&self) -> f64 {
        if self.trials.is_empty() {
            return 0.0;
        }
        self.trials.iter().map(|t| t.best_profit).sum::<f64>() / self.trials.len() as f64
    }

    pub fn worst_profit(&self) -> f64 {
        self.trials
            .iter()
            .map(|t| t.best_profit)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Runs one annealer `num_runs` times with independent seeds.
pub struct MultiRun {
    annealer: SimulatedAnnealing,
    num_runs: usize,
    seeds: RngHierarchy,
    parallel: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl MultiRun {
    pub fn new(annealer: SimulatedAnnealing, num_runs: usize, seeds: RngHierarchy) -> Self {
        Self {
            annealer,
            num_runs,
            seeds,
            parallel: true,
            cancel: None,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn num_runs(&self) -> usize {
        self.num_runs
    }

    pub fn annealer(&self) -> &SimulatedAnnealing {
        &self.annealer
    }

    pub fn run(&self, ledger: &TradeLedger) -> Result<MultiRunOutcome, MultiRunError> {
        self.run_with_progress(ledger, |_, _, _| {})
    }

    /// Run every trial, invoking `on_progress(completed, total, summary)`
    /// after each one finishes.
    pub fn run_with_progress<F>(
        &self,
        ledger: &TradeLedger,
        on_progress: F,
    ) -> Result<MultiRunOutcome, MultiRunError>
    where
        F: Fn(usize, usize, &TrialSummary) + Send + Sync,
    {
        if self.num_runs == 0 {
            return Err(MultiRunError::NoRuns);
        }
        let pool = self.annealer.candidate_pool(ledger);
        let completed = AtomicUsize::new(0);
        let total = self.num_runs;

        log::info!(
            "running {total} annealing trials over {} candidates ({})",
            pool.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let trial = |run: usize| -> Result<(TrialSummary, AnnealingOutcome), MultiRunError> {
            let seed = self.seeds.sub_seed(MULTI_RUN_SCOPE, run as u64);
            let mut rng = self.seeds.rng_for(MULTI_RUN_SCOPE, run as u64);
            let outcome = self
                .annealer
                .run_on_pool(ledger, &pool, &mut rng, self.cancel.as_deref())
                .map_err(|source| MultiRunError::Run { run, seed, source })?;
            let summary = TrialSummary {
                run,
                seed,
                best_profit: outcome.best_profit(),
                iterations: outcome.iterations,
                termination: outcome.termination,
            };
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            on_progress(done, total, &summary);
            Ok((summary, outcome))
        };

        let results: Vec<Result<(TrialSummary, AnnealingOutcome), MultiRunError>> = if self.parallel {
            (0..total).into_par_iter().map(trial).collect()
        } else {
            (0..total).map(trial).collect()
        };

        // Reduce in run order so the winner does not depend on scheduling.
        let mut trials = Vec::with_capacity(total);
        let mut best: Option<(usize, AnnealingOutcome)> = None;
        for result in results {
            let (summary, outcome) = result?;
            let improves = best
                .as_ref()
                .map_or(true, |(_, b)| outcome.best_profit() > b.best_profit());
            if improves {
                best = Some((summary.run, outcome));
            }
            trials.push(summary);
        }

        let (best_run, best) = best.ok_or(MultiRunError::NoRuns)?;
        log::debug!("best trial {best_run}: profit {:.4}", best.best_profit());
        Ok(MultiRunOutcome {
            best_run,
            best,
            trials,
        })
    }
}
