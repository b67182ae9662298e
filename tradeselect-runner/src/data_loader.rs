//! Ledger ingestion from CSV.
//!
//! Expected columns (header row required, extra columns ignored):
//! - `quantity`: signed quantity, positive buys and negative sells
//! - `price`: unit price, finite and non-negative
//! - `index` (optional): source row id; rows are ordered by it
//! - `time_id` (optional): grouping key carried through to exports
//! - `side` (optional): `buy` / `sell`; when present the quantity is taken
//!   as a magnitude and signed by the side
//!
//! Every malformed row fails the load with its line number. Nothing is
//! skipped silently: a ledger with a missing trade would change the
//! running position of every later trade.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tradeselect_core::{LedgerError, LedgerSummary, Trade, TradeLedger};

/// Errors from the ingestion layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open ledger {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {field} is not a finite number")]
    NonFinite { line: u64, field: &'static str },

    #[error("line {line}: negative price {price}")]
    NegativePrice { line: u64, price: f64 },

    #[error("line {line}: unknown side '{side}' (expected buy or sell)")]
    UnknownSide { line: u64, side: String },

    #[error("line {line}: index column is blank but other rows carry one")]
    MissingIndex { line: u64 },

    #[error("duplicate index {index}")]
    DuplicateIndex { index: i64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    quantity: f64,
    price: f64,
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    time_id: Option<i64>,
    #[serde(default)]
    side: Option<String>,
}

/// A loaded ledger plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedLedger {
    pub ledger: TradeLedger,
    pub summary: LedgerSummary,
    /// BLAKE3 over every trade's quantity and price, in ledger order.
    pub dataset_hash: String,
}

/// Load a ledger from a CSV file.
pub fn load_ledger(path: &Path) -> Result<LoadedLedger, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let loaded = read_ledger(reader)?;
    log::info!(
        "loaded {} trades from {} ({} buys, {} sells, final position {})",
        loaded.summary.trade_count,
        path.display(),
        loaded.summary.buy_count,
        loaded.summary.sell_count,
        loaded.summary.final_position,
    );
    Ok(loaded)
}

/// Load a ledger from any CSV source.
pub fn load_ledger_from_reader<R: Read>(source: R) -> Result<LoadedLedger, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    read_ledger(reader)
}

fn read_ledger<R: Read>(mut reader: csv::Reader<R>) -> Result<LoadedLedger, LoadError> {
    // (line, source index, quantity, price, time_id)
    let mut rows: Vec<(u64, Option<i64>, f64, f64, Option<i64>)> = Vec::new();

    for (i, record) in reader.deserialize::<LedgerRow>().enumerate() {
        // Header is line 1.
        let line = i as u64 + 2;
        let row = record.map_err(|source| LoadError::Parse { line, source })?;

        if !row.quantity.is_finite() {
            return Err(LoadError::NonFinite { line, field: "quantity" });
        }
        if !row.price.is_finite() {
            return Err(LoadError::NonFinite { line, field: "price" });
        }
        if row.price < 0.0 {
            return Err(LoadError::NegativePrice { line, price: row.price });
        }

        let side = row.side.as_deref().map(str::to_ascii_lowercase);
        let quantity = match side.as_deref() {
            None | Some("") => row.quantity,
            Some("buy") | Some("b") => row.quantity.abs(),
            Some("sell") | Some("s") => -row.quantity.abs(),
            Some(_) => {
                return Err(LoadError::UnknownSide {
                    line,
                    side: row.side.clone().unwrap_or_default(),
                })
            }
        };

        rows.push((line, row.index, quantity, row.price, row.time_id));
    }

    let indexed = rows.iter().any(|r| r.1.is_some());
    if indexed {
        if let Some(row) = rows.iter().find(|r| r.1.is_none()) {
            return Err(LoadError::MissingIndex { line: row.0 });
        }
        // Stable: equal ids would keep file order, but duplicates are rejected below.
        rows.sort_by_key(|r| r.1);
        if let Some(pair) = rows.windows(2).find(|w| w[0].1 == w[1].1) {
            return Err(LoadError::DuplicateIndex {
                index: pair[0].1.unwrap_or_default(),
            });
        }
    }

    let trades: Vec<Trade> = rows
        .into_iter()
        .enumerate()
        .map(|(position, (_, source_index, quantity, price, time_id))| Trade {
            index: position,
            quantity,
            price,
            time_id,
            source_index,
        })
        .collect();

    let ledger = TradeLedger::new(trades)?;
    let summary = ledger.summary();
    let dataset_hash = compute_dataset_hash(&ledger);
    Ok(LoadedLedger {
        ledger,
        summary,
        dataset_hash,
    })
}

/// Deterministic BLAKE3 hash over the ledger contents.
///
/// Two files that load to the same trades in the same order hash the
/// same, regardless of column order or formatting.
pub fn compute_dataset_hash(ledger: &TradeLedger) -> String {
    let mut hasher = blake3::Hasher::new();
    for trade in ledger {
        hasher.update(&trade.quantity.to_le_bytes());
        hasher.update(&trade.price.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
