//! Optimization report: everything one command produced, in one document.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeselect_core::annealing::{AnnealingConfig, AnnealingOutcome, Termination};
use tradeselect_core::greedy::{GreedyOutcome, GreedyRanking};
use tradeselect_core::{LedgerSummary, Selection, TradeLedger};

use crate::multi_run::MultiRunOutcome;
use crate::sweep::{GridPoint, SweepResults};

/// Current report schema version. Bump on breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// How many grid points a search report keeps besides the winner.
pub const TOP_GRID_POINTS: usize = 10;

/// Which optimizer produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Greedy,
    Anneal,
    Search,
    MultiRun,
    Optimize,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Greedy => "greedy",
            Method::Anneal => "anneal",
            Method::Search => "search",
            Method::MultiRun => "multi_run",
            Method::Optimize => "optimize",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedyStats {
    pub ranking: GreedyRanking,
    pub accepted: usize,
    pub rejected: usize,
}

impl GreedyStats {
    pub fn from_outcome(ranking: GreedyRanking, outcome: &GreedyOutcome) -> Self {
        Self {
            ranking,
            accepted: outcome.accepted_order.len(),
            rejected: outcome.rejected,
        }
    }
}

/// Schedule used and counters of the run that produced the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealingStats {
    pub config: AnnealingConfig,
    pub seed: u64,
    pub initial_profit: f64,
    pub iterations: usize,
    pub accepted_moves: usize,
    pub unchanged_moves: usize,
    pub improving_moves: usize,
    pub infeasible_moves: usize,
    pub final_temperature: f64,
    pub termination: Termination,
}

impl AnnealingStats {
    pub fn from_outcome(config: &AnnealingConfig, seed: u64, outcome: &AnnealingOutcome) -> Self {
        Self {
            config: config.clone(),
            seed,
            initial_profit: outcome.initial_profit,
            iterations: outcome.iterations,
            accepted_moves: outcome.accepted_moves,
            unchanged_moves: outcome.unchanged_moves,
            improving_moves: outcome.improving_moves,
            infeasible_moves: outcome.infeasible_moves,
            final_temperature: outcome.final_temperature,
            termination: outcome.termination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScore {
    pub index: usize,
    pub point: GridPoint,
    pub best_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub grid_size: usize,
    pub best: GridScore,
    /// Highest-scoring points, best first.
    pub top: Vec<GridScore>,
}

impl SearchStats {
    /// `None` for an empty result set.
    pub fn from_results(results: &SweepResults) -> Option<Self> {
        let score = |e: &crate::sweep::GridEvaluation| GridScore {
            index: e.index,
            point: e.point,
            best_profit: e.best_profit(),
        };
        let best = results.best().map(score)?;
        Some(Self {
            grid_size: results.len(),
            best,
            top: results.top_n(TOP_GRID_POINTS).into_iter().map(score).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiRunStats {
    pub num_runs: usize,
    pub best_run: usize,
    pub best_profit: f64,
    pub mean_profit: f64,
    pub worst_profit: f64,
}

impl MultiRunStats {
    pub fn from_outcome(outcome: &MultiRunOutcome) -> Self {
        Self {
            num_runs: outcome.trials.len(),
            best_run: outcome.best_run,
            best_profit: outcome.best_profit(),
            mean_profit: outcome.mean_profit(),
            worst_profit: outcome.worst_profit(),
        }
    }
}

/// Complete, serializable result of one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub schema_version: u32,
    pub method: Method,
    pub generated_at: DateTime<Utc>,
    pub dataset_hash: String,
    pub ledger: LedgerSummary,
    /// Master seed. Absent for the deterministic greedy selector.
    pub seed: Option<u64>,
    pub position_limit: f64,
    pub profit: f64,
    pub selection: Selection,
    /// Ledger indices of the selected trades, ascending.
    pub trade_indices: Vec<usize>,
    /// Largest absolute running position of the selection, in ledger order.
    pub max_abs_position: f64,
    pub within_limit: bool,
    #[serde(default)]
    pub greedy: Option<GreedyStats>,
    #[serde(default)]
    pub annealing: Option<AnnealingStats>,
    #[serde(default)]
    pub search: Option<SearchStats>,
    #[serde(default)]
    pub multi_run: Option<MultiRunStats>,
}

impl OptimizationReport {
    /// A report for `selection` with no stage statistics attached yet.
    pub fn new(
        method: Method,
        ledger: &TradeLedger,
        dataset_hash: &str,
        position_limit: f64,
        selection: Selection,
    ) -> Self {
        let max_abs_position = selection.max_abs_position(ledger);
        Self {
            schema_version: SCHEMA_VERSION,
            method,
            generated_at: Utc::now(),
            dataset_hash: dataset_hash.to_string(),
            ledger: ledger.summary(),
            seed: None,
            position_limit,
            profit: selection.profit(),
            trade_indices: selection.trade_indices(ledger),
            max_abs_position,
            within_limit: max_abs_position <= position_limit,
            selection,
            greedy: None,
            annealing: None,
            search: None,
            multi_run: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_are_snake_case() {
        assert_eq!(Method::MultiRun.to_string(), "multi_run");
        let json = serde_json::to_string(&Method::MultiRun).unwrap();
        assert_eq!(json, "\"multi_run\"");
    }

    #[test]
    fn report_derives_position_fields() {
        let ledger = TradeLedger::from_pairs(&[(10.0, 5.0), (-5.0, 20.0), (-5.0, 10.0)]).unwrap();
        let selection = Selection::from_positions(&ledger, [0, 1, 2]);
        let report = OptimizationReport::new(Method::Greedy, &ledger, "abc", 8.0, selection);
        assert_eq!(report.profit, 100.0);
        assert_eq!(report.trade_indices, vec![0, 1, 2]);
        assert_eq!(report.max_abs_position, 10.0);
        assert!(!report.within_limit);
        assert_eq!(report.seed, None);
        assert_eq!(report.schema_version, SCHEMA_VERSION);
    }
}
