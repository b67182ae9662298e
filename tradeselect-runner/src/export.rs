//! Artifact export: JSON report, selection CSV, Markdown summary.
//!
//! All persisted reports carry a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tradeselect_core::TradeLedger;

use crate::result::{OptimizationReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &OptimizationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize OptimizationReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<OptimizationReport> {
    let report: OptimizationReport =
        serde_json::from_str(json).context("failed to deserialize OptimizationReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// The selected trades in ledger order.
///
/// Columns: index, source_index, time_id, quantity, price, position,
/// profit. `position` is the running position over the selection and
/// `profit` the trade's own contribution to the subset profit.
pub fn export_selection_csv(report: &OptimizationReport, ledger: &TradeLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "index",
        "source_index",
        "time_id",
        "quantity",
        "price",
        "position",
        "profit",
    ])?;

    let mut position = 0.0;
    for &pos in report.selection.positions() {
        let trade = ledger
            .get(pos)
            .with_context(|| format!("selected position {pos} is outside the ledger"))?;
        position += trade.quantity;
        wtr.write_record([
            &trade.index.to_string(),
            &trade.source_index.map(|i| i.to_string()).unwrap_or_default(),
            &trade.time_id.map(|t| t.to_string()).unwrap_or_default(),
            &format!("{:.6}", trade.quantity),
            &format!("{:.6}", trade.price),
            &format!("{:.6}", position),
            &format!("{:.6}", trade.profit()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Human-readable summary of a report.
pub fn generate_summary(report: &OptimizationReport) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str(&format!("# Trade Selection ({})\n\n", report.method));

    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Generated | {} |\n", report.generated_at.to_rfc3339()));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    md.push_str(&format!("| Ledger Trades | {} |\n", report.ledger.trade_count));
    if let Some(seed) = report.seed {
        md.push_str(&format!("| Seed | {seed} |\n"));
    }
    md.push_str(&format!("| Position Limit | {} |\n", report.position_limit));
    md.push_str(&format!("| Profit | {:.4} |\n", report.profit));
    md.push_str(&format!("| Selected Trades | {} |\n", report.selected_count()));
    md.push_str(&format!("| Max Abs Position | {:.4} |\n", report.max_abs_position));
    if !report.within_limit {
        md.push_str("| Limit | **EXCEEDED** |\n");
    }
    md.push('\n');

    if let Some(g) = &report.greedy {
        md.push_str("## Greedy\n\n");
        md.push_str(&format!(
            "Ranking `{:?}`: {} accepted, {} rejected.\n\n",
            g.ranking, g.accepted, g.rejected
        ));
    }

    if let Some(a) = &report.annealing {
        md.push_str("## Annealing\n\n");
        md.push_str("| Parameter | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Initial Temp | {} |\n", a.config.initial_temp));
        md.push_str(&format!("| Cooling Rate | {} |\n", a.config.cooling_rate));
        md.push_str(&format!("| Iterations | {} / {} |\n", a.iterations, a.config.num_iterations));
        md.push_str(&format!("| Accepted Moves | {} |\n", a.accepted_moves));
        md.push_str(&format!("| Unchanged Moves | {} |\n", a.unchanged_moves));
        md.push_str(&format!("| Improving Moves | {} |\n", a.improving_moves));
        md.push_str(&format!("| Initial Profit | {:.4} |\n", a.initial_profit));
        md.push_str(&format!("| Final Temp | {:.6} |\n", a.final_temperature));
        md.push_str(&format!("| Termination | {:?} |\n", a.termination));
        md.push('\n');
    }

    if let Some(s) = &report.search {
        md.push_str("## Grid Search\n\n");
        md.push_str(&format!("{} points evaluated.\n\n", s.grid_size));
        md.push_str("| # | Initial Temp | Cooling Rate | Iterations | Profit |\n");
        md.push_str("| ---: | ---: | ---: | ---: | ---: |\n");
        for score in &s.top {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.4} |\n",
                score.index,
                score.point.initial_temp,
                score.point.cooling_rate,
                score.point.num_iterations,
                score.best_profit
            ));
        }
        md.push('\n');
    }

    if let Some(m) = &report.multi_run {
        md.push_str("## Multi-Run\n\n");
        md.push_str(&format!(
            "{} runs: best {:.4} (run {}), mean {:.4}, worst {:.4}.\n\n",
            m.num_runs, m.best_profit, m.best_run, m.mean_profit, m.worst_profit
        ));
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one report.
///
/// Creates `{method}_{timestamp}/` under `output_dir` containing:
/// - `report.json`: the full `OptimizationReport`
/// - `selection.csv`: the selected trades
/// - `summary.md`: the Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    report: &OptimizationReport,
    ledger: &TradeLedger,
    output_dir: &Path,
) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        report.method,
        report.generated_at.format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(
        run_dir.join("selection.csv"),
        export_selection_csv(report, ledger)?,
    )?;
    std::fs::write(run_dir.join("summary.md"), generate_summary(report))?;

    log::info!("artifacts written to {}", run_dir.display());
    Ok(run_dir)
}

/// Load a report from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<OptimizationReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
