//! Selection — a complete, returned subset of the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::{Trade, TradeLedger};
use crate::feasibility::cumulative_positions;
use crate::profit::subset_profit;

/// A set of ledger positions plus its profit.
///
/// Positions are sorted ascending and unique, so iterating them visits the
/// chosen trades in original ledger order, the order in which the position
/// limit is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    positions: Vec<usize>,
    profit: f64,
}

impl Selection {
    /// Build a selection, sorting and deduplicating positions and
    /// evaluating its profit.
    ///
    /// # Panics
    /// If any position is out of range for the ledger.
    pub fn from_positions<I>(ledger: &TradeLedger, positions: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut positions: Vec<usize> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();
        let profit = subset_profit(ledger, &positions);
        Self { positions, profit }
    }

    /// Wrap positions that are already sorted and unique, with a profit
    /// evaluated over them in that order.
    pub(crate) fn from_sorted(positions: Vec<usize>, profit: f64) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Self { positions, profit }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn profit(&self) -> f64 {
        self.profit
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    /// The selected trades in ledger order.
    pub fn trades<'a>(&'a self, ledger: &'a TradeLedger) -> impl Iterator<Item = &'a Trade> + 'a {
        self.positions.iter().map(move |&p| ledger.trade(p))
    }

    /// Running position over the selected trades, in ledger order.
    pub fn running_positions(&self, ledger: &TradeLedger) -> Vec<f64> {
        cumulative_positions(self.trades(ledger))
    }

    /// Largest absolute running position at any prefix (0 when empty).
    pub fn max_abs_position(&self, ledger: &TradeLedger) -> f64 {
        self.running_positions(ledger)
            .into_iter()
            .fold(0.0, |acc, p| acc.max(p.abs()))
    }

    /// True iff every prefix of the selection, in ledger order, stays
    /// within `limit` in absolute value.
    pub fn respects_limit(&self, ledger: &TradeLedger, limit: f64) -> bool {
        self.max_abs_position(ledger) <= limit
    }

    /// Indices (ledger identity) of the selected trades.
    pub fn trade_indices(&self, ledger: &TradeLedger) -> Vec<usize> {
        self.trades(ledger).map(|t| t.index).collect()
    }
}
