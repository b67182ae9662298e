//! End-to-end command pipelines on the three-trade reference ledger.
//!
//! Ledger: buy 100 @ 10, sell 50 @ 12, sell 60 @ 9; limit 100. The best
//! subset is the two sells (profit 1140); greedy takes all three (140).

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use tradeselect_core::annealing::{AnnealingConfig, Termination};
use tradeselect_runner::{
    load_artifacts, load_ledger, run_from_file, run_method, save_artifacts, AxisRange, LoadedLedger,
    Method, OptimizerConfig, SearchConfig,
};

const LEDGER_CSV: &str = "quantity,price\n100,10\n-50,12\n-60,9\n";

fn write_ledger(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("ledger.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn loaded() -> (TempDir, LoadedLedger) {
    let dir = TempDir::new().unwrap();
    let path = write_ledger(&dir, LEDGER_CSV);
    let loaded = load_ledger(&path).unwrap();
    (dir, loaded)
}

fn config() -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.seed = 7;
    config.selection.position_limit = 100.0;
    config.annealing = AnnealingConfig {
        initial_temp: 500.0,
        cooling_rate: 0.99,
        num_iterations: 2000,
        initial_sample_size: 1,
        ..AnnealingConfig::default()
    };
    config.search = SearchConfig {
        initial_temp: AxisRange::new(100.0, 600.0, 250.0),
        cooling_rate: AxisRange::new(0.98, 0.995, 0.01),
        num_iterations: AxisRange::single(2000.0),
        parallel: true,
    };
    config.multi_run.num_runs = 4;
    config
}

#[test]
fn greedy_takes_all_three() {
    let (_dir, loaded) = loaded();
    let report = run_method(Method::Greedy, &loaded, &config()).unwrap();
    assert_eq!(report.trade_indices, vec![0, 1, 2]);
    assert_eq!(report.profit, 140.0);
    assert_eq!(report.seed, None);
    let greedy = report.greedy.unwrap();
    assert_eq!(greedy.accepted, 3);
    assert_eq!(greedy.rejected, 0);
}

#[test]
fn anneal_finds_the_two_sells() {
    let (_dir, loaded) = loaded();
    let report = run_method(Method::Anneal, &loaded, &config()).unwrap();
    assert_eq!(report.trade_indices, vec![1, 2]);
    assert_eq!(report.profit, 1140.0);
    assert_eq!(report.seed, Some(7));
    let stats = report.annealing.unwrap();
    assert_eq!(stats.termination, Termination::TemperatureFloor);
    assert!(stats.iterations < 2000);
}

#[test]
fn search_reports_grid() {
    let (_dir, loaded) = loaded();
    let report = run_method(Method::Search, &loaded, &config()).unwrap();
    assert_eq!(report.profit, 1140.0);
    let search = report.search.unwrap();
    assert_eq!(search.grid_size, 4);
    assert_eq!(search.best.best_profit, 1140.0);
    // Every point reaches the optimum, so the earliest wins.
    assert_eq!(search.best.index, 0);
    assert_eq!(search.top.len(), 4);
}

#[test]
fn multi_run_reports_all_trials() {
    let (_dir, loaded) = loaded();
    let report = run_method(Method::MultiRun, &loaded, &config()).unwrap();
    assert_eq!(report.profit, 1140.0);
    let stats = report.multi_run.unwrap();
    assert_eq!(stats.num_runs, 4);
    assert_eq!(stats.best_run, 0);
    assert_eq!(stats.best_profit, 1140.0);
    assert!(stats.worst_profit <= stats.mean_profit);
}

#[test]
fn optimize_runs_both_stages() {
    let (_dir, loaded) = loaded();
    let report = run_method(Method::Optimize, &loaded, &config()).unwrap();
    assert_eq!(report.method, Method::Optimize);
    assert_eq!(report.profit, 1140.0);
    assert!(report.search.is_some());
    assert!(report.multi_run.is_some());
    // The repeated stage runs with the winning grid schedule.
    let schedule = report.annealing.unwrap().config;
    assert_eq!(schedule.initial_temp, 100.0);
    assert_eq!(schedule.cooling_rate, 0.98);
}

#[test]
fn reports_are_reproducible() {
    let (_dir, loaded) = loaded();
    let config = config();
    for method in [Method::Anneal, Method::Search, Method::MultiRun] {
        let a = run_method(method, &loaded, &config).unwrap();
        let b = run_method(method, &loaded, &config).unwrap();
        assert_eq!(a.selection, b.selection);
        assert_eq!(a.annealing, b.annealing);
    }
}

#[test]
fn sequential_matches_parallel() {
    let (_dir, loaded) = loaded();
    let parallel = config();
    let mut sequential = config();
    sequential.search.parallel = false;
    sequential.multi_run.parallel = false;
    let a = run_method(Method::Optimize, &loaded, &parallel).unwrap();
    let b = run_method(Method::Optimize, &loaded, &sequential).unwrap();
    assert_eq!(a.selection, b.selection);
    assert_eq!(a.search, b.search);
    assert_eq!(a.multi_run, b.multi_run);
}

#[test]
fn default_sample_size_fails_on_tiny_ledger() {
    let (_dir, loaded) = loaded();
    let mut config = config();
    config.annealing.initial_sample_size = 10;
    let err = run_method(Method::MultiRun, &loaded, &config).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("run 0"), "{msg}");
    assert!(msg.contains("needs 10"), "{msg}");
}

#[test]
fn invalid_config_rejected_before_running() {
    let (_dir, loaded) = loaded();
    let mut config = config();
    config.annealing.cooling_rate = 1.0;
    let err = run_method(Method::Anneal, &loaded, &config).unwrap_err();
    assert!(err.to_string().contains("cooling_rate"));
}

#[test]
fn artifacts_roundtrip() {
    let dir = TempDir::new().unwrap();
    let ledger_path = write_ledger(&dir, LEDGER_CSV);
    let report = run_from_file(Method::Anneal, &ledger_path, &config()).unwrap();
    let loaded = load_ledger(&ledger_path).unwrap();

    let out = TempDir::new().unwrap();
    let run_dir = save_artifacts(&report, &loaded.ledger, out.path()).unwrap();
    assert!(run_dir.file_name().unwrap().to_string_lossy().starts_with("anneal_"));
    assert!(run_dir.join("report.json").exists());
    assert!(run_dir.join("summary.md").exists());

    let csv = std::fs::read_to_string(run_dir.join("selection.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let back = load_artifacts(&run_dir).unwrap();
    assert_eq!(back.selection, report.selection);
    assert_eq!(back.dataset_hash, loaded.dataset_hash);
}

#[test]
fn indexed_ledger_keeps_source_ids_in_export() {
    let dir = TempDir::new().unwrap();
    let path = write_ledger(
        &dir,
        "index,time_id,side,quantity,price\n30,2,sell,60,9\n10,1,buy,100,10\n20,1,sell,50,12\n",
    );
    let loaded = load_ledger(&path).unwrap();
    let report = run_method(Method::Anneal, &loaded, &config()).unwrap();
    assert_eq!(report.trade_indices, vec![1, 2]);

    let csv = tradeselect_runner::export_selection_csv(&report, &loaded.ledger).unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert!(rows[0].starts_with("1,20,1,"));
    assert!(rows[1].starts_with("2,30,2,"));
}
