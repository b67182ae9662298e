//! TradeSelect Core — the constrained trade-selection optimizer.
//!
//! This crate contains the algorithmic heart of the workspace:
//! - Domain types (trades, the read-only trade ledger, selections)
//! - Profit evaluation over arbitrary subsets
//! - Position feasibility filter and candidate pool
//! - Greedy selector (rank by contribution, accept while within the limit)
//! - Simulated annealing optimizer as an explicit state machine
//! - Deterministic seed hierarchy for reproducible parallel trials
//!
//! There is no I/O here. Ledgers come in from the runner crate and
//! selections go back out to it.

pub mod annealing;
pub mod domain;
pub mod error;
pub mod feasibility;
pub mod greedy;
pub mod profit;
pub mod rng;
pub mod selection;

pub use annealing::{
    AnnealingConfig, AnnealingOutcome, AnnealingState, DecisionSource, SimulatedAnnealing,
    Termination,
};
pub use domain::{LedgerSummary, Side, Trade, TradeLedger};
pub use error::{LedgerError, OptimizeError};
pub use feasibility::{CandidatePool, DEFAULT_POSITION_LIMIT};
pub use greedy::{GreedyOutcome, GreedyRanking, GreedySelector};
pub use profit::{profit, subset_profit};
pub use rng::RngHierarchy;
pub use selection::Selection;
