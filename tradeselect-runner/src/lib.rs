//! TradeSelect Runner — configuration, ledger ingestion, search drivers, artifacts.
//!
//! This crate builds on `tradeselect-core` to provide:
//! - TOML configuration with validation
//! - CSV ledger ingestion with row-level error reporting
//! - Grid search over annealing schedules (parallel, deterministic)
//! - Multi-run driver: best of N independently seeded trials
//! - Command pipelines producing an `OptimizationReport`
//! - JSON / CSV / Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod multi_run;
pub mod result;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, GreedyConfig, MultiRunConfig, OptimizerConfig, SearchConfig, SelectionConfig};
pub use data_loader::{compute_dataset_hash, load_ledger, load_ledger_from_reader, LoadError, LoadedLedger};
pub use export::{export_json, export_selection_csv, generate_summary, import_json, load_artifacts, save_artifacts};
pub use multi_run::{MultiRun, MultiRunError, MultiRunOutcome, TrialSummary};
pub use result::{Method, OptimizationReport, SCHEMA_VERSION};
pub use runner::{
    run_annealing, run_from_file, run_greedy, run_method, run_multi_run, run_optimize, run_search,
    RunError,
};
pub use sweep::{AxisRange, GridEvaluation, GridPoint, ParamGrid, ParamSweep, SearchError, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn drivers_are_send_sync() {
        assert_send::<ParamSweep>();
        assert_sync::<ParamSweep>();
        assert_send::<MultiRun>();
        assert_sync::<MultiRun>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<GridEvaluation>();
        assert_sync::<GridEvaluation>();
        assert_send::<SweepResults>();
        assert_send::<MultiRunOutcome>();
        assert_send::<OptimizationReport>();
        assert_sync::<OptimizationReport>();
    }

    #[test]
    fn config_and_errors_are_send_sync() {
        assert_send::<OptimizerConfig>();
        assert_sync::<OptimizerConfig>();
        assert_send::<LoadedLedger>();
        assert_sync::<LoadedLedger>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
