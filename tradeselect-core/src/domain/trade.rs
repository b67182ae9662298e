//! Trade — a single ledger row as the optimizer sees it.

use serde::{Deserialize, Serialize};

/// Direction implied by the sign of a trade's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    /// Zero quantity: contributes neither position nor profit.
    Flat,
}

/// An immutable trade record.
///
/// `quantity` is signed: positive for buys, negative for sells. Ingestion
/// normalizes explicit buy/sell columns into this convention, so a positive
/// contribution to the cumulative position always means added long exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Position in ledger order. Identity of the trade.
    pub index: usize,
    pub quantity: f64,
    pub price: f64,
    /// Grouping key for downstream reporting. Never read by the optimizer.
    #[serde(default)]
    pub time_id: Option<i64>,
    /// Row identifier from the source file, if it had one.
    #[serde(default)]
    pub source_index: Option<i64>,
}

impl Trade {
    pub fn new(index: usize, quantity: f64, price: f64) -> Self {
        Self {
            index,
            quantity,
            price,
            time_id: None,
            source_index: None,
        }
    }

    pub fn with_time_id(mut self, time_id: i64) -> Self {
        self.time_id = Some(time_id);
        self
    }

    pub fn side(&self) -> Side {
        if self.quantity > 0.0 {
            Side::Buy
        } else if self.quantity < 0.0 {
            Side::Sell
        } else {
            Side::Flat
        }
    }

    /// `price × quantity`: the ranking key of the greedy selector.
    ///
    /// Positive for buys (cash paid), negative for sells (cash received).
    pub fn contribution(&self) -> f64 {
        self.price * self.quantity
    }

    /// Realized profit of this trade on its own: sell proceeds minus buy cost.
    pub fn profit(&self) -> f64 {
        match self.side() {
            Side::Flat => 0.0,
            Side::Buy | Side::Sell => -self.contribution(),
        }
    }
}
