//! TradeSelect CLI — pick the most profitable position-limited subset of a trade ledger.
//!
//! Commands:
//! - `greedy` — rank trades and accept while the running position fits
//! - `anneal` — one simulated annealing run
//! - `search` — grid search over annealing schedules
//! - `multi-run` — best of N independently seeded annealing runs
//! - `optimize` — grid search, then multi-run with the winning schedule

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tradeselect_core::GreedyRanking;
use tradeselect_runner::{
    generate_summary, load_ledger, run_method, save_artifacts, Method, OptimizationReport,
    OptimizerConfig,
};

#[derive(Parser)]
#[command(
    name = "tradeselect",
    about = "TradeSelect CLI — constrained trade-selection optimizer"
)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct CommonArgs {
    /// Trade ledger CSV (columns: quantity, price; optional index, time_id, side).
    #[arg(long)]
    ledger: PathBuf,

    /// TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Master seed (overrides the config).
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum absolute running position (overrides the config).
    #[arg(long)]
    position_limit: Option<f64>,

    /// Write report.json, selection.csv and summary.md under this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run grid points and trials on one thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank trades and accept each one while the running position stays within the limit.
    Greedy {
        #[command(flatten)]
        common: CommonArgs,

        /// Ranking key.
        #[arg(long, value_enum)]
        ranking: Option<RankingArg>,
    },
    /// Run simulated annealing once.
    Anneal {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Grid search over initial temperature, cooling rate and iteration budget.
    Search {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Repeat annealing with independent seeds and keep the best run.
    MultiRun {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Number of runs (overrides the config).
        #[arg(long)]
        runs: Option<usize>,
    },
    /// Grid search, then multi-run with the best schedule.
    Optimize {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of runs in the second stage (overrides the config).
        #[arg(long)]
        runs: Option<usize>,
    },
}

/// Annealing schedule overrides.
#[derive(Args)]
struct ScheduleArgs {
    /// Starting temperature.
    #[arg(long)]
    initial_temp: Option<f64>,

    /// Per-iteration cooling factor in [0, 1).
    #[arg(long)]
    cooling_rate: Option<f64>,

    /// Iteration budget.
    #[arg(long)]
    iterations: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RankingArg {
    /// price × quantity, descending.
    Contribution,
    /// Per-trade profit, descending.
    Profit,
}

impl From<RankingArg> for GreedyRanking {
    fn from(arg: RankingArg) -> Self {
        match arg {
            RankingArg::Contribution => GreedyRanking::Contribution,
            RankingArg::Profit => GreedyRanking::Profit,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Greedy { common, ranking } => {
            let mut config = load_config(&common)?;
            if let Some(ranking) = ranking {
                config.greedy.ranking = ranking.into();
            }
            run_cmd(Method::Greedy, &common, config)
        }
        Commands::Anneal { common, schedule } => {
            let mut config = load_config(&common)?;
            schedule.apply(&mut config);
            run_cmd(Method::Anneal, &common, config)
        }
        Commands::Search { common } => {
            let config = load_config(&common)?;
            run_cmd(Method::Search, &common, config)
        }
        Commands::MultiRun {
            common,
            schedule,
            runs,
        } => {
            let mut config = load_config(&common)?;
            schedule.apply(&mut config);
            if let Some(runs) = runs {
                config.multi_run.num_runs = runs;
            }
            run_cmd(Method::MultiRun, &common, config)
        }
        Commands::Optimize { common, runs } => {
            let mut config = load_config(&common)?;
            if let Some(runs) = runs {
                config.multi_run.num_runs = runs;
            }
            run_cmd(Method::Optimize, &common, config)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Config file (or defaults) with the shared CLI overrides applied.
fn load_config(common: &CommonArgs) -> Result<OptimizerConfig> {
    let mut config = match &common.config {
        Some(path) => OptimizerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OptimizerConfig::default(),
    };
    if let Some(seed) = common.seed {
        config.seed = seed;
    }
    if let Some(limit) = common.position_limit {
        config.selection.position_limit = limit;
    }
    if common.sequential {
        config.search.parallel = false;
        config.multi_run.parallel = false;
    }
    Ok(config)
}

impl ScheduleArgs {
    fn apply(&self, config: &mut OptimizerConfig) {
        if let Some(t) = self.initial_temp {
            config.annealing.initial_temp = t;
        }
        if let Some(c) = self.cooling_rate {
            config.annealing.cooling_rate = c;
        }
        if let Some(n) = self.iterations {
            config.annealing.num_iterations = n;
        }
    }
}

fn run_cmd(method: Method, common: &CommonArgs, config: OptimizerConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let loaded = load_ledger(&common.ledger)
        .with_context(|| format!("loading ledger {}", common.ledger.display()))?;

    let report = run_method(method, &loaded, &config)?;
    print_summary(&report);

    if let Some(output_dir) = &common.output_dir {
        let run_dir = save_artifacts(&report, &loaded.ledger, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    } else {
        log::debug!("\n{}", generate_summary(&report));
    }
    Ok(())
}

fn print_summary(report: &OptimizationReport) {
    println!();
    println!("=== {} ===", report.method);
    println!("Ledger:           {} trades", report.ledger.trade_count);
    if let Some(seed) = report.seed {
        println!("Seed:             {seed}");
    }
    println!("Position limit:   {}", report.position_limit);
    println!("Profit:           {:.4}", report.profit);
    println!("Selected trades:  {}", report.selected_count());
    println!(
        "Max |position|:   {:.4}{}",
        report.max_abs_position,
        if report.within_limit { "" } else { "  (exceeds limit)" }
    );

    if let Some(greedy) = &report.greedy {
        println!("Ranking:          {:?}", greedy.ranking);
        println!("Rejected:         {}", greedy.rejected);
    }
    if let Some(search) = &report.search {
        let best = &search.best;
        println!();
        println!("--- Grid search ({} points) ---", search.grid_size);
        println!("Best point:       #{}", best.index);
        println!("  initial_temp:   {}", best.point.initial_temp);
        println!("  cooling_rate:   {}", best.point.cooling_rate);
        println!("  num_iterations: {}", best.point.num_iterations);
        println!("  profit:         {:.4}", best.best_profit);
    }
    if let Some(multi) = &report.multi_run {
        println!();
        println!("--- Multi-run ({} runs) ---", multi.num_runs);
        println!("Best run:         #{} ({:.4})", multi.best_run, multi.best_profit);
        println!("Mean profit:      {:.4}", multi.mean_profit);
        println!("Worst profit:     {:.4}", multi.worst_profit);
    }
    if let Some(annealing) = &report.annealing {
        println!();
        println!(
            "Annealing:        {} iterations, {:?}, initial profit {:.4}",
            annealing.iterations, annealing.termination, annealing.initial_profit
        );
    }

    let preview: Vec<String> = report
        .trade_indices
        .iter()
        .take(20)
        .map(|i| i.to_string())
        .collect();
    let more = report.trade_indices.len().saturating_sub(preview.len());
    println!();
    if more > 0 {
        println!("Trades: [{}, ... {more} more]", preview.join(", "));
    } else {
        println!("Trades: [{}]", preview.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_to_defaults() {
        let cli = Cli::parse_from([
            "tradeselect",
            "multi-run",
            "--ledger",
            "ledger.csv",
            "--seed",
            "9",
            "--position-limit",
            "250",
            "--sequential",
            "--runs",
            "5",
            "--cooling-rate",
            "0.9",
        ]);
        let Commands::MultiRun { common, schedule, runs } = cli.command else {
            panic!("expected multi-run");
        };
        let mut config = load_config(&common).unwrap();
        schedule.apply(&mut config);
        assert_eq!(config.seed, 9);
        assert_eq!(config.selection.position_limit, 250.0);
        assert!(!config.multi_run.parallel);
        assert!(!config.search.parallel);
        assert_eq!(config.annealing.cooling_rate, 0.9);
        assert_eq!(config.annealing.initial_temp, 1000.0);
        assert_eq!(runs, Some(5));
    }

    #[test]
    fn ranking_flag_parses() {
        let cli = Cli::parse_from([
            "tradeselect",
            "greedy",
            "--ledger",
            "l.csv",
            "--ranking",
            "profit",
        ]);
        let Commands::Greedy { ranking, .. } = cli.command else {
            panic!("expected greedy");
        };
        assert_eq!(GreedyRanking::from(ranking.unwrap()), GreedyRanking::Profit);
    }
}
