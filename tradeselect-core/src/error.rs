//! Error types for ledger construction and optimization.

use thiserror::Error;

/// Errors raised while building a [`TradeLedger`](crate::domain::TradeLedger).
///
/// These surface at the ingestion boundary, before any optimizer runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("ledger contains no trades")]
    Empty,

    #[error("trade at position {position} carries index {index}; indices must match ledger order")]
    IndexMismatch { position: usize, index: usize },

    #[error("trade {index}: {field} is not a finite number")]
    NonFinite { index: usize, field: &'static str },

    #[error("trade {index}: negative price {price}")]
    NegativePrice { index: usize, price: f64 },
}

/// Errors raised by the optimizers themselves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// The candidate pool is smaller than the initial sample the annealer needs.
    #[error("candidate pool has {available} trades but the initial sample needs {required}")]
    InsufficientCandidates { required: usize, available: usize },

    /// No candidate keeps the running position within the limit on its own.
    #[error("no candidate trade fits within position limit {limit}")]
    NoFeasibleStart { limit: f64 },

    #[error("invalid optimizer config: {0}")]
    InvalidConfig(String),
}
