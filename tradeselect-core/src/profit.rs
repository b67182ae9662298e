//! Profit evaluator — net realized profit of an arbitrary subset of trades.
//!
//! Profit is sell proceeds minus buy cost. It depends only on which trades
//! are in the subset, never on their order, and has no hidden state.

use crate::domain::{Side, Trade, TradeLedger};

/// Net realized profit of a set of trades.
///
/// Buys (`quantity > 0`) and sells (`quantity < 0`) are accumulated
/// separately and differenced once at the end, which keeps the two large
/// sums apart until the final subtraction. An empty input yields `0.0`.
pub fn profit<'a, I>(trades: I) -> f64
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut sell_proceeds = 0.0;
    let mut buy_cost = 0.0;
    for trade in trades {
        match trade.side() {
            Side::Sell => sell_proceeds += -trade.quantity * trade.price,
            Side::Buy => buy_cost += trade.quantity * trade.price,
            Side::Flat => {}
        }
    }
    sell_proceeds - buy_cost
}

/// Profit of the trades at the given ledger positions.
///
/// # Panics
/// If any position is out of range for the ledger.
pub fn subset_profit(ledger: &TradeLedger, positions: &[usize]) -> f64 {
    profit(positions.iter().map(|&p| ledger.trade(p)))
}
