//! Greedy selector — rank by per-trade contribution, accept while feasible.
//!
//! Fast and deterministic, with no optimality guarantee. The running
//! position is tracked over *accepted* trades in processing (rank) order,
//! and a candidate is accepted iff the position after it stays within the
//! limit.

use serde::{Deserialize, Serialize};

use crate::domain::{Trade, TradeLedger};
use crate::selection::Selection;

/// Ranking key for the greedy pass. Both sort descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyRanking {
    /// `price × quantity`, largest first. Buys rank ahead of sells.
    #[default]
    Contribution,
    /// Per-trade profit (`−price × quantity`), largest first. Sells rank
    /// ahead of buys.
    Profit,
}

impl GreedyRanking {
    fn key(&self, trade: &Trade) -> f64 {
        match self {
            Self::Contribution => trade.contribution(),
            Self::Profit => trade.profit(),
        }
    }
}

/// Result of a greedy pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedyOutcome {
    pub selection: Selection,
    /// Accepted positions in the order they were accepted.
    pub accepted_order: Vec<usize>,
    /// Running position after each accepted trade, parallel to `accepted_order`.
    pub position_path: Vec<f64>,
    pub rejected: usize,
}

/// Greedy selector over the full ledger.
#[derive(Debug, Clone)]
pub struct GreedySelector {
    position_limit: f64,
    ranking: GreedyRanking,
}

impl GreedySelector {
    pub fn new(position_limit: f64) -> Self {
        Self {
            position_limit,
            ranking: GreedyRanking::default(),
        }
    }

    pub fn with_ranking(mut self, ranking: GreedyRanking) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn ranking(&self) -> GreedyRanking {
        self.ranking
    }

    pub fn position_limit(&self) -> f64 {
        self.position_limit
    }

    /// Ledger positions in processing order.
    ///
    /// The sort is stable, so ties keep ascending ledger order.
    pub fn processing_order(&self, ledger: &TradeLedger) -> Vec<usize> {
        let keys: Vec<f64> = ledger.iter().map(|t| self.ranking.key(t)).collect();
        let mut order: Vec<usize> = (0..ledger.len()).collect();
        order.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));
        order
    }

    pub fn select(&self, ledger: &TradeLedger) -> GreedyOutcome {
        let mut running = 0.0_f64;
        let mut accepted_order = Vec::new();
        let mut position_path = Vec::new();
        let mut rejected = 0;

        for pos in self.processing_order(ledger) {
            let next = running + ledger.trade(pos).quantity;
            if next.abs() <= self.position_limit {
                running = next;
                accepted_order.push(pos);
                position_path.push(running);
            } else {
                rejected += 1;
            }
        }

        let selection = Selection::from_positions(ledger, accepted_order.iter().copied());
        log::debug!(
            "greedy ({:?}): accepted {} of {} trades, profit {:.2}",
            self.ranking,
            accepted_order.len(),
            ledger.len(),
            selection.profit()
        );

        GreedyOutcome {
            selection,
            accepted_order,
            position_path,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> TradeLedger {
        TradeLedger::from_pairs(&[(100.0, 10.0), (-50.0, 12.0), (-60.0, 9.0)]).unwrap()
    }

    #[test]
    fn scenario_contribution_ranking() {
        // Contributions: 1000, -600, -540 → order 0, 2, 1.
        let ledger = scenario();
        let out = GreedySelector::new(100.0).select(&ledger);
        assert_eq!(out.accepted_order, vec![0, 2, 1]);
        assert_eq!(out.position_path, vec![100.0, 40.0, -10.0]);
        assert_eq!(out.selection.positions(), &[0, 1, 2]);
        // 600 + 540 − 1000
        assert_eq!(out.selection.profit(), 140.0);
        assert_eq!(out.rejected, 0);
    }

    #[test]
    fn scenario_profit_ranking() {
        // Profits: -1000, 600, 540 → order 1, 2, 0.
        let ledger = scenario();
        let out = GreedySelector::new(100.0)
            .with_ranking(GreedyRanking::Profit)
            .select(&ledger);
        assert_eq!(out.accepted_order, vec![1, 0]);
        assert_eq!(out.position_path, vec![-50.0, 50.0]);
        assert_eq!(out.rejected, 1);
        assert_eq!(out.selection.profit(), -400.0);
    }

    #[test]
    fn rejects_trade_that_breaches_limit() {
        let ledger = TradeLedger::from_pairs(&[(80.0, 1.0), (30.0, 1.0), (10.0, 1.0)]).unwrap();
        let out = GreedySelector::new(100.0).select(&ledger);
        assert_eq!(out.accepted_order, vec![0, 2]);
        assert_eq!(out.rejected, 1);
    }

    #[test]
    fn ties_keep_ledger_order() {
        let ledger = TradeLedger::from_pairs(&[(10.0, 1.0), (5.0, 2.0), (2.0, 5.0)]).unwrap();
        let order = GreedySelector::new(100.0).processing_order(&ledger);
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn deterministic() {
        let ledger = scenario();
        let selector = GreedySelector::new(60.0);
        assert_eq!(selector.select(&ledger), selector.select(&ledger));
    }
}
