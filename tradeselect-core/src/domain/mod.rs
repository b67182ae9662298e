//! Domain types for TradeSelect

pub mod ledger;
pub mod trade;

pub use ledger::{LedgerSummary, TradeLedger};
pub use trade::{Side, Trade};
