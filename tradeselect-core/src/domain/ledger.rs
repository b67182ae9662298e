//! TradeLedger — the ordered, read-only input to every optimizer.

use serde::{Deserialize, Serialize};

use super::trade::{Side, Trade};
use crate::error::LedgerError;

/// An ordered, immutable sequence of trades.
///
/// Order is arrival order and `trades[i].index == i` always holds. A ledger
/// is never empty. Optimizers borrow it read-only, so one ledger can be
/// shared across any number of concurrent runs.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    /// Build a ledger, validating order, finiteness, and prices.
    pub fn new(trades: Vec<Trade>) -> Result<Self, LedgerError> {
        if trades.is_empty() {
            return Err(LedgerError::Empty);
        }
        for (position, trade) in trades.iter().enumerate() {
            if trade.index != position {
                return Err(LedgerError::IndexMismatch {
                    position,
                    index: trade.index,
                });
            }
            if !trade.quantity.is_finite() {
                return Err(LedgerError::NonFinite {
                    index: position,
                    field: "quantity",
                });
            }
            if !trade.price.is_finite() {
                return Err(LedgerError::NonFinite {
                    index: position,
                    field: "price",
                });
            }
            if trade.price < 0.0 {
                return Err(LedgerError::NegativePrice {
                    index: position,
                    price: trade.price,
                });
            }
        }
        Ok(Self { trades })
    }

    /// Build a ledger from `(quantity, price)` pairs in order.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, LedgerError> {
        let trades = pairs
            .iter()
            .enumerate()
            .map(|(i, &(quantity, price))| Trade::new(i, quantity, price))
            .collect();
        Self::new(trades)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True if the ledger holds no trades.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// The trade at `position`.
    ///
    /// # Panics
    /// If `position >= self.len()`.
    pub fn trade(&self, position: usize) -> &Trade {
        &self.trades[position]
    }

    pub fn get(&self, position: usize) -> Option<&Trade> {
        self.trades.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    /// Descriptive totals for logging at the ingestion boundary.
    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            trade_count: self.trades.len(),
            ..LedgerSummary::default()
        };
        let mut position = 0.0_f64;
        for trade in &self.trades {
            match trade.side() {
                Side::Buy => {
                    summary.buy_count += 1;
                    summary.gross_buy_cost += trade.quantity * trade.price;
                }
                Side::Sell => {
                    summary.sell_count += 1;
                    summary.gross_sell_proceeds += -trade.quantity * trade.price;
                }
                Side::Flat => {}
            }
            position += trade.quantity;
            summary.peak_abs_position = summary.peak_abs_position.max(position.abs());
        }
        summary.final_position = position;
        summary
    }
}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

/// Whole-ledger totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub trade_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub gross_buy_cost: f64,
    pub gross_sell_proceeds: f64,
    /// Cumulative position after the last trade, all trades included.
    pub final_position: f64,
    /// Largest absolute cumulative position over the full ledger.
    pub peak_abs_position: f64,
}
