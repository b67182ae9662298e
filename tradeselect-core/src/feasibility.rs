//! Position feasibility filter and the candidate pool built from it.
//!
//! The filter flags a trade as "potentially includable" when the running
//! position over the *whole* ledger, up to and including that trade, stays
//! within the limit. It is a coarse pre-filter that shrinks the pool the
//! annealer draws from. It is not a feasibility test for a chosen subset;
//! see [`Selection::respects_limit`](crate::selection::Selection::respects_limit)
//! for that.

use serde::{Deserialize, Serialize};

use crate::domain::{Trade, TradeLedger};

/// Default bound on the absolute cumulative position.
pub const DEFAULT_POSITION_LIMIT: f64 = 100_000.0;

/// Running prefix sums of signed quantity, in the order given.
pub fn cumulative_positions<'a, I>(trades: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut position = 0.0;
    trades
        .into_iter()
        .map(|t| {
            position += t.quantity;
            position
        })
        .collect()
}

/// Per-trade "potentially includable" flags over the full ledger.
///
/// `flags[i]` is true iff `|Σ quantity[0..=i]| <= limit`.
pub fn potential_trades(ledger: &TradeLedger, limit: f64) -> Vec<bool> {
    cumulative_positions(ledger)
        .into_iter()
        .map(|p| p.abs() <= limit)
        .collect()
}

/// Ledger positions flagged by [`potential_trades`], in ledger order.
///
/// Built once per ledger and limit, then shared read-only by every
/// annealing run drawn from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePool {
    positions: Vec<usize>,
    limit: f64,
}

impl CandidatePool {
    pub fn from_ledger(ledger: &TradeLedger, limit: f64) -> Self {
        let positions = potential_trades(ledger, limit)
            .into_iter()
            .enumerate()
            .filter_map(|(i, ok)| ok.then_some(i))
            .collect();
        Self { positions, limit }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// The ledger position of the `slot`-th candidate.
    ///
    /// # Panics
    /// If `slot >= self.len()`.
    pub fn at(&self, slot: usize) -> usize {
        self.positions[slot]
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }
}
