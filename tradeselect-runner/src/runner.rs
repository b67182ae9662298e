//! Command pipelines: ledger + config in, `OptimizationReport` out.
//!
//! Each entry point owns the seeding for its method so that the same
//! ledger, config and master seed always produce the same report (apart
//! from its timestamp).

use std::path::Path;

use thiserror::Error;

use tradeselect_core::annealing::SimulatedAnnealing;
use tradeselect_core::greedy::GreedySelector;
use tradeselect_core::{OptimizeError, RngHierarchy};

use crate::config::{ConfigError, OptimizerConfig};
use crate::data_loader::{load_ledger, LoadError, LoadedLedger};
use crate::multi_run::{MultiRun, MultiRunError, MultiRunOutcome};
use crate::result::{
    AnnealingStats, GreedyStats, Method, MultiRunStats, OptimizationReport, SearchStats,
};
use crate::sweep::{GridEvaluation, ParamGrid, ParamSweep, SearchError, SweepResults};

/// RNG scope of the single `anneal` run.
pub const ANNEAL_SCOPE: &str = "anneal";

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("optimizer error: {0}")]
    Optimize(#[from] OptimizeError),
    #[error("search error: {0}")]
    Search(#[from] SearchError),
    #[error("multi-run error: {0}")]
    MultiRun(#[from] MultiRunError),
}

/// Load the ledger at `path` and run `method` on it.
pub fn run_from_file(
    method: Method,
    ledger_path: &Path,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    let loaded = load_ledger(ledger_path)?;
    run_method(method, &loaded, config)
}

pub fn run_method(
    method: Method,
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    config.validate()?;
    match method {
        Method::Greedy => Ok(run_greedy(loaded, config)),
        Method::Anneal => run_annealing(loaded, config),
        Method::Search => run_search(loaded, config),
        Method::MultiRun => run_multi_run(loaded, config),
        Method::Optimize => run_optimize(loaded, config),
    }
}

// ─── Single-stage commands ──────────────────────────────────────────

pub fn run_greedy(loaded: &LoadedLedger, config: &OptimizerConfig) -> OptimizationReport {
    let limit = config.selection.position_limit;
    let ranking = config.greedy.ranking;
    let outcome = GreedySelector::new(limit).with_ranking(ranking).select(&loaded.ledger);
    log::info!(
        "greedy ({ranking:?}): {} trades accepted, {} rejected, profit {:.4}",
        outcome.accepted_order.len(),
        outcome.rejected,
        outcome.selection.profit()
    );

    let stats = GreedyStats::from_outcome(ranking, &outcome);
    let mut report = OptimizationReport::new(
        Method::Greedy,
        &loaded.ledger,
        &loaded.dataset_hash,
        limit,
        outcome.selection,
    );
    report.greedy = Some(stats);
    report
}

pub fn run_annealing(
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    let limit = config.selection.position_limit;
    let annealer = SimulatedAnnealing::new(config.annealing.clone(), limit)?;
    let seeds = RngHierarchy::new(config.seed);
    let seed = seeds.sub_seed(ANNEAL_SCOPE, 0);
    let mut rng = seeds.rng_for(ANNEAL_SCOPE, 0);

    let outcome = annealer.run(&loaded.ledger, &mut rng)?;
    log::info!(
        "annealing stopped after {} iterations ({:?}): best profit {:.4} from initial {:.4}",
        outcome.iterations,
        outcome.termination,
        outcome.best_profit(),
        outcome.initial_profit
    );

    let stats = AnnealingStats::from_outcome(annealer.config(), seed, &outcome);
    let mut report = OptimizationReport::new(
        Method::Anneal,
        &loaded.ledger,
        &loaded.dataset_hash,
        limit,
        outcome.selection,
    )
    .with_seed(config.seed);
    report.annealing = Some(stats);
    Ok(report)
}

pub fn run_search(
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    let results = sweep(loaded, config)?;
    let best = best_evaluation(&results)?;
    log::info!(
        "best grid point {} ({}): profit {:.4}",
        best.index,
        best.point,
        best.best_profit()
    );

    let schedule = best.point.apply(&config.annealing);
    let annealing = AnnealingStats::from_outcome(&schedule, best.seed, &best.outcome);
    let mut report = OptimizationReport::new(
        Method::Search,
        &loaded.ledger,
        &loaded.dataset_hash,
        config.selection.position_limit,
        best.outcome.selection.clone(),
    )
    .with_seed(config.seed);
    report.annealing = Some(annealing);
    report.search = SearchStats::from_results(&results);
    Ok(report)
}

pub fn run_multi_run(
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    let annealer = SimulatedAnnealing::new(config.annealing.clone(), config.selection.position_limit)?;
    let outcome = repeat(loaded, config, annealer)?;
    Ok(multi_run_report(Method::MultiRun, loaded, config, &config.annealing, outcome))
}

// ─── Pipeline ───────────────────────────────────────────────────────

/// Grid search to pick a schedule, then repeated trials with it.
pub fn run_optimize(
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
) -> Result<OptimizationReport, RunError> {
    let results = sweep(loaded, config)?;
    let best = best_evaluation(&results)?;
    log::info!(
        "calibrated schedule: {} (grid profit {:.4})",
        best.point,
        best.best_profit()
    );

    let schedule = best.point.apply(&config.annealing);
    let annealer = SimulatedAnnealing::new(schedule.clone(), config.selection.position_limit)?;
    let outcome = repeat(loaded, config, annealer)?;

    let mut report = multi_run_report(Method::Optimize, loaded, config, &schedule, outcome);
    report.search = SearchStats::from_results(&results);
    Ok(report)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn sweep(loaded: &LoadedLedger, config: &OptimizerConfig) -> Result<SweepResults, SearchError> {
    let search = &config.search;
    let grid = ParamGrid::from_axes(&search.initial_temp, &search.cooling_rate, &search.num_iterations);
    let total = grid.size();
    let step = (total / 10).max(1);

    ParamSweep::new(
        config.annealing.clone(),
        config.selection.position_limit,
        RngHierarchy::new(config.seed),
    )
    .with_parallelism(search.parallel)
    .sweep_with_progress(&loaded.ledger, &grid, |done, total, _| {
        if done % step == 0 || done == total {
            log::info!("grid search: {done}/{total} points");
        }
    })
}

fn best_evaluation(results: &SweepResults) -> Result<&GridEvaluation, SearchError> {
    results.best().ok_or(SearchError::EmptyGrid)
}

fn repeat(
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
    annealer: SimulatedAnnealing,
) -> Result<MultiRunOutcome, MultiRunError> {
    let outcome = MultiRun::new(annealer, config.multi_run.num_runs, RngHierarchy::new(config.seed))
        .with_parallelism(config.multi_run.parallel)
        .run(&loaded.ledger)?;
    log::info!(
        "best of {} runs: run {} with profit {:.4} (mean {:.4})",
        outcome.trials.len(),
        outcome.best_run,
        outcome.best_profit(),
        outcome.mean_profit()
    );
    Ok(outcome)
}

fn multi_run_report(
    method: Method,
    loaded: &LoadedLedger,
    config: &OptimizerConfig,
    schedule: &tradeselect_core::AnnealingConfig,
    outcome: MultiRunOutcome,
) -> OptimizationReport {
    let stats = MultiRunStats::from_outcome(&outcome);
    let seed = outcome.trials[outcome.best_run].seed;
    let annealing = AnnealingStats::from_outcome(schedule, seed, &outcome.best);
    let mut report = OptimizationReport::new(
        method,
        &loaded.ledger,
        &loaded.dataset_hash,
        config.selection.position_limit,
        outcome.best.selection,
    )
    .with_seed(config.seed);
    report.annealing = Some(annealing);
    report.multi_run = Some(stats);
    report
}
