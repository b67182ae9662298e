//! Grid search over annealing schedules.
//!
//! Every combination of `(initial_temp, cooling_rate, num_iterations)` gets
//! one annealing run on the same ledger. Each grid point draws from its own
//! seeded stream, so the result is identical with or without parallelism.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradeselect_core::annealing::{AnnealingConfig, AnnealingOutcome, SimulatedAnnealing};
use tradeselect_core::{CandidatePool, OptimizeError, RngHierarchy, TradeLedger};

/// RNG scope for grid points.
pub const GRID_SCOPE: &str = "grid";

// ─── Axes ───────────────────────────────────────────────────────────

/// One grid axis: the half-open range `[start, stop)` in steps of `step`.
///
/// `start == stop` is a single-value axis, which pins that parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl AxisRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    pub fn single(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err("start, stop and step must be finite".into());
        }
        if self.step <= 0.0 {
            return Err(format!("step must be > 0, got {}", self.step));
        }
        if self.stop < self.start {
            return Err(format!("stop {} is below start {}", self.stop, self.start));
        }
        Ok(())
    }

    /// Materialize the axis values.
    ///
    /// Values are `start + i * step` (not accumulated) rounded to 12 decimal
    /// places, so `0.990..0.999 step 0.001` yields nine clean values.
    pub fn values(&self) -> Vec<f64> {
        if self.stop == self.start {
            return vec![self.start];
        }
        if self.step <= 0.0 || self.stop < self.start {
            return Vec::new();
        }
        let tolerance = self.step * 1e-9;
        let mut values = Vec::new();
        let mut i = 0u32;
        loop {
            let value = self.start + f64::from(i) * self.step;
            if value >= self.stop - tolerance {
                break;
            }
            values.push((value * 1e12).round() / 1e12);
            i += 1;
        }
        values
    }
}

// ─── Grid ───────────────────────────────────────────────────────────

/// One combination of annealing schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub initial_temp: f64,
    pub cooling_rate: f64,
    pub num_iterations: usize,
}

impl GridPoint {
    /// The annealing config for this point, other knobs taken from `base`.
    pub fn apply(&self, base: &AnnealingConfig) -> AnnealingConfig {
        base.with_schedule(self.initial_temp, self.cooling_rate, self.num_iterations)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "initial_temp={} cooling_rate={} num_iterations={}",
            self.initial_temp, self.cooling_rate, self.num_iterations
        )
    }
}

/// Parameter grid: the Cartesian product of three axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub initial_temps: Vec<f64>,
    pub cooling_rates: Vec<f64>,
    pub iteration_budgets: Vec<usize>,
}

impl ParamGrid {
    pub fn new(initial_temps: Vec<f64>, cooling_rates: Vec<f64>, iteration_budgets: Vec<usize>) -> Self {
        Self {
            initial_temps,
            cooling_rates,
            iteration_budgets,
        }
    }

    pub fn from_axes(initial_temp: &AxisRange, cooling_rate: &AxisRange, num_iterations: &AxisRange) -> Self {
        Self::new(
            initial_temp.values(),
            cooling_rate.values(),
            num_iterations
                .values()
                .into_iter()
                .map(|v| v.round().max(0.0) as usize)
                .collect(),
        )
    }

    /// Total number of grid points.
    pub fn size(&self) -> usize {
        self.initial_temps.len() * self.cooling_rates.len() * self.iteration_budgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// All points in enumeration order: temperature outermost, iteration
    /// budget innermost. The position in this list is the point's index.
    pub fn points(&self) -> Vec<GridPoint> {
        let mut points = Vec::with_capacity(self.size());
        for &initial_temp in &self.initial_temps {
            for &cooling_rate in &self.cooling_rates {
                for &num_iterations in &self.iteration_budgets {
                    points.push(GridPoint {
                        initial_temp,
                        cooling_rate,
                        num_iterations,
                    });
                }
            }
        }
        points
    }
}

// ─── Sweep ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("parameter grid is empty")]
    EmptyGrid,
    #[error("grid point {index} ({point}) failed: {source}")]
    Run {
        index: usize,
        point: GridPoint,
        #[source]
        source: OptimizeError,
    },
}

/// Result of one grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridEvaluation {
    pub index: usize,
    pub point: GridPoint,
    pub seed: u64,
    pub outcome: AnnealingOutcome,
}

impl GridEvaluation {
    pub fn best_profit(&self) -> f64 {
        self.outcome.best_profit()
    }
}

/// Evaluates every grid point against one ledger.
pub struct ParamSweep {
    base: AnnealingConfig,
    position_limit: f64,
    seeds: RngHierarchy,
    parallel: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl ParamSweep {
    /// `base` supplies everything the grid does not vary.
    pub fn new(base: AnnealingConfig, position_limit: f64, seeds: RngHierarchy) -> Self {
        Self {
            base,
            position_limit,
            seeds,
            parallel: true,
            cancel: None,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Stop flag shared with every run. Cancelled runs still report their
    /// best-so-far.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn sweep(&self, ledger: &TradeLedger, grid: &ParamGrid) -> Result<SweepResults, SearchError> {
        self.sweep_with_progress(ledger, grid, |_, _, _| {})
    }

    /// Sweep with a callback invoked after each grid point completes.
    ///
    /// The callback receives `(completed, total, evaluation)`. Under
    /// parallel execution completions arrive in any order.
    pub fn sweep_with_progress<F>(
        &self,
        ledger: &TradeLedger,
        grid: &ParamGrid,
        on_progress: F,
    ) -> Result<SweepResults, SearchError>
    where
        F: Fn(usize, usize, &GridEvaluation) + Send + Sync,
    {
        if grid.is_empty() {
            return Err(SearchError::EmptyGrid);
        }
        let points = grid.points();
        let total = points.len();
        let pool = CandidatePool::from_ledger(ledger, self.position_limit);
        let completed = std::sync::atomic::AtomicUsize::new(0);

        log::info!(
            "searching {total} grid points over {} candidates ({})",
            pool.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let evaluate = |(index, point): (usize, &GridPoint)| {
            let result = self.evaluate(ledger, &pool, index, *point);
            if let Ok(evaluation) = &result {
                let done = completed.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                on_progress(done, total, evaluation);
            }
            result
        };

        let results: Vec<Result<GridEvaluation, SearchError>> = if self.parallel {
            points.par_iter().enumerate().map(evaluate).collect()
        } else {
            points.iter().enumerate().map(evaluate).collect()
        };

        // First failure in grid order, whatever order the workers finished in.
        let evaluations = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(SweepResults { evaluations })
    }

    fn evaluate(
        &self,
        ledger: &TradeLedger,
        pool: &CandidatePool,
        index: usize,
        point: GridPoint,
    ) -> Result<GridEvaluation, SearchError> {
        let wrap = |source| SearchError::Run { index, point, source };
        let annealer = SimulatedAnnealing::new(point.apply(&self.base), self.position_limit).map_err(wrap)?;
        let seed = self.seeds.sub_seed(GRID_SCOPE, index as u64);
        let mut rng = self.seeds.rng_for(GRID_SCOPE, index as u64);
        let outcome = annealer
            .run_on_pool(ledger, pool, &mut rng, self.cancel.as_deref())
            .map_err(wrap)?;
        log::debug!("grid point {index} ({point}): best profit {:.4}", outcome.best_profit());
        Ok(GridEvaluation {
            index,
            point,
            seed,
            outcome,
        })
    }
}

/// All grid evaluations, in grid order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    pub evaluations: Vec<GridEvaluation>,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    /// Highest best-profit point; ties go to the earliest grid point.
    pub fn best(&self) -> Option<&GridEvaluation> {
        let mut best: Option<&GridEvaluation> = None;
        for evaluation in &self.evaluations {
            if best.map_or(true, |b| evaluation.best_profit() > b.best_profit()) {
                best = Some(evaluation);
            }
        }
        best
    }

    /// Evaluations sorted by best profit, descending. Stable, so ties keep
    /// grid order.
    pub fn sorted_by_profit(&self) -> Vec<&GridEvaluation> {
        let mut sorted: Vec<&GridEvaluation> = self.evaluations.iter().collect();
        sorted.sort_by(|a, b| b.best_profit().total_cmp(&a.best_profit()));
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&GridEvaluation> {
        self.sorted_by_profit().into_iter().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeselect_core::Trade;

    fn small_grid() -> ParamGrid {
        ParamGrid::new(vec![100.0, 500.0], vec![0.95, 0.99], vec![50, 200])
    }

    fn ledger() -> TradeLedger {
        let trades = (0..30)
            .map(|i| {
                let qty = if i % 2 == 0 { 10.0 } else { -10.0 };
                let price = 100.0 + ((i * 7) % 11) as f64;
                Trade::new(i, qty, price)
            })
            .collect();
        TradeLedger::new(trades).unwrap()
    }

    fn base() -> AnnealingConfig {
        AnnealingConfig {
            initial_sample_size: 3,
            ..AnnealingConfig::default()
        }
    }

    #[test]
    fn axis_is_half_open() {
        assert_eq!(AxisRange::new(500.0, 5500.0, 500.0).values().len(), 10);
        let cooling = AxisRange::new(0.990, 0.999, 0.001).values();
        assert_eq!(cooling.len(), 9);
        assert_eq!(cooling[0], 0.99);
        assert_eq!(cooling[1], 0.991);
        assert_eq!(cooling[8], 0.998);
    }

    #[test]
    fn single_value_axis() {
        assert_eq!(AxisRange::single(0.97).values(), vec![0.97]);
    }

    #[test]
    fn axis_validation() {
        assert!(AxisRange::new(1.0, 2.0, 0.0).validate().is_err());
        assert!(AxisRange::new(2.0, 1.0, 0.5).validate().is_err());
        assert!(AxisRange::new(f64::NAN, 1.0, 0.5).validate().is_err());
        assert!(AxisRange::new(1.0, 2.0, 0.5).validate().is_ok());
    }

    #[test]
    fn grid_size_and_order() {
        let grid = small_grid();
        assert_eq!(grid.size(), 8);
        let points = grid.points();
        assert_eq!(points.len(), 8);
        assert_eq!(
            points[0],
            GridPoint { initial_temp: 100.0, cooling_rate: 0.95, num_iterations: 50 }
        );
        assert_eq!(points[1].num_iterations, 200);
        assert_eq!(points[2].cooling_rate, 0.99);
        assert_eq!(points[4].initial_temp, 500.0);
    }

    #[test]
    fn default_grid_has_900_points() {
        let grid = ParamGrid::from_axes(
            &AxisRange::new(500.0, 5500.0, 500.0),
            &AxisRange::new(0.990, 0.999, 0.001),
            &AxisRange::new(500.0, 5500.0, 500.0),
        );
        assert_eq!(grid.size(), 900);
        assert_eq!(grid.iteration_budgets[0], 500);
        assert_eq!(grid.iteration_budgets[9], 5000);
    }

    #[test]
    fn empty_grid_is_an_error() {
        let grid = ParamGrid::new(vec![], vec![0.99], vec![100]);
        let sweep = ParamSweep::new(base(), 1000.0, RngHierarchy::new(1));
        assert!(matches!(sweep.sweep(&ledger(), &grid), Err(SearchError::EmptyGrid)));
    }

    #[test]
    fn sweep_evaluates_every_point_in_grid_order() {
        let results = ParamSweep::new(base(), 1000.0, RngHierarchy::new(5))
            .sweep(&ledger(), &small_grid())
            .unwrap();
        assert_eq!(results.len(), 8);
        for (i, evaluation) in results.evaluations.iter().enumerate() {
            assert_eq!(evaluation.index, i);
            assert_eq!(evaluation.point, small_grid().points()[i]);
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let ledger = ledger();
        let grid = small_grid();
        let par = ParamSweep::new(base(), 1000.0, RngHierarchy::new(9))
            .sweep(&ledger, &grid)
            .unwrap();
        let seq = ParamSweep::new(base(), 1000.0, RngHierarchy::new(9))
            .with_parallelism(false)
            .sweep(&ledger, &grid)
            .unwrap();
        for (a, b) in par.evaluations.iter().zip(&seq.evaluations) {
            assert_eq!(a.seed, b.seed);
            assert_eq!(a.outcome, b.outcome);
        }
        assert_eq!(par.best().unwrap().index, seq.best().unwrap().index);
    }

    #[test]
    fn best_is_at_least_every_point() {
        let results = ParamSweep::new(base(), 1000.0, RngHierarchy::new(3))
            .sweep(&ledger(), &small_grid())
            .unwrap();
        let best = results.best().unwrap().best_profit();
        assert!(results.evaluations.iter().all(|e| e.best_profit() <= best));
        assert_eq!(results.top_n(1)[0].best_profit(), best);
    }

    #[test]
    fn ties_go_to_earliest_point() {
        // Zero iterations leaves every point at its initial sample; a
        // single-candidate pool makes every initial sample identical.
        let ledger = TradeLedger::from_pairs(&[(10.0, 5.0)]).unwrap();
        let grid = ParamGrid::new(vec![10.0, 20.0], vec![0.9], vec![0]);
        let config = AnnealingConfig {
            initial_sample_size: 1,
            ..AnnealingConfig::default()
        };
        let results = ParamSweep::new(config, 1000.0, RngHierarchy::new(0))
            .sweep(&ledger, &grid)
            .unwrap();
        assert_eq!(results.best().unwrap().index, 0);
    }

    #[test]
    fn insufficient_pool_reports_first_point() {
        let config = AnnealingConfig::default(); // sample size 10
        let ledger = TradeLedger::from_pairs(&[(1.0, 1.0), (-1.0, 2.0)]).unwrap();
        let err = ParamSweep::new(config, 1000.0, RngHierarchy::new(0))
            .sweep(&ledger, &small_grid())
            .unwrap_err();
        match err {
            SearchError::Run { index, source, .. } => {
                assert_eq!(index, 0);
                assert_eq!(
                    source,
                    OptimizeError::InsufficientCandidates { required: 10, available: 2 }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn progress_reaches_total() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = AtomicUsize::new(0);
        let max_done = AtomicUsize::new(0);
        ParamSweep::new(base(), 1000.0, RngHierarchy::new(2))
            .sweep_with_progress(&ledger(), &small_grid(), |done, total, _| {
                assert_eq!(total, 8);
                calls.fetch_add(1, Ordering::Relaxed);
                max_done.fetch_max(done, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 8);
        assert_eq!(max_done.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn raised_cancel_flag_stops_every_point() {
        use tradeselect_core::annealing::Termination;
        let cancel = Arc::new(AtomicBool::new(true));
        let results = ParamSweep::new(base(), 1000.0, RngHierarchy::new(4))
            .with_cancel(cancel)
            .sweep(&ledger(), &small_grid())
            .unwrap();
        assert_eq!(results.len(), 8);
        for evaluation in &results.evaluations {
            assert_eq!(evaluation.outcome.iterations, 0);
            assert_eq!(evaluation.outcome.termination, Termination::Cancelled);
            assert_eq!(evaluation.best_profit(), evaluation.outcome.initial_profit);
        }
    }
}
