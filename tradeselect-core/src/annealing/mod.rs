//! Simulated annealing over subsets of feasibility-filtered trades.
//!
//! A run draws a random initial solution from the candidate pool, then
//! repeatedly proposes add/remove neighbors, accepting improvements always
//! and losses with probability `exp(Δ / T)`. The temperature decays
//! geometrically. The run ends when the iteration budget is spent, the
//! temperature falls below the floor, or a cancellation flag is raised,
//! whichever comes first. The best solution seen is returned.
//!
//! Solutions are sets: adding a trade already present is a no-op move.

pub mod config;
pub mod decision;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::TradeLedger;
use crate::error::OptimizeError;
use crate::feasibility::CandidatePool;
use crate::selection::Selection;

pub use config::AnnealingConfig;
pub use decision::{acceptance_probability, DecisionSource};
pub use state::{AnnealingState, Move, StepOutcome, WorkingSet};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    IterationBudget,
    TemperatureFloor,
    Cancelled,
}

/// Output of one annealing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealingOutcome {
    /// Best solution seen; its profit is the run's best profit.
    pub selection: Selection,
    pub initial_profit: f64,
    pub iterations: usize,
    /// Accepted moves that changed the solution.
    pub accepted_moves: usize,
    /// Iterations whose proposal left the solution as it was.
    pub unchanged_moves: usize,
    pub improving_moves: usize,
    pub infeasible_moves: usize,
    pub final_temperature: f64,
    pub termination: Termination,
    /// Largest absolute running position of the best solution, ledger order.
    pub max_abs_position: f64,
}

impl AnnealingOutcome {
    pub fn best_profit(&self) -> f64 {
        self.selection.profit()
    }
}

/// A configured annealer. Stateless between runs.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    config: AnnealingConfig,
    position_limit: f64,
}

impl SimulatedAnnealing {
    pub fn new(config: AnnealingConfig, position_limit: f64) -> Result<Self, OptimizeError> {
        config.validate()?;
        if position_limit.is_nan() || position_limit <= 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "position_limit must be > 0, got {position_limit}"
            )));
        }
        Ok(Self {
            config,
            position_limit,
        })
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    pub fn position_limit(&self) -> f64 {
        self.position_limit
    }

    /// The candidate pool this annealer draws from for `ledger`.
    pub fn candidate_pool(&self, ledger: &TradeLedger) -> CandidatePool {
        CandidatePool::from_ledger(ledger, self.position_limit)
    }

    /// Run once, building the candidate pool from the ledger.
    pub fn run<D: DecisionSource + ?Sized>(
        &self,
        ledger: &TradeLedger,
        draws: &mut D,
    ) -> Result<AnnealingOutcome, OptimizeError> {
        let pool = self.candidate_pool(ledger);
        self.run_on_pool(ledger, &pool, draws, None)
    }

    /// Run once over a prebuilt pool.
    ///
    /// Drivers build the pool once and share it across runs. The optional
    /// `cancel` flag is checked before every iteration; a cancelled run
    /// still returns its best-so-far.
    pub fn run_on_pool<D: DecisionSource + ?Sized>(
        &self,
        ledger: &TradeLedger,
        pool: &CandidatePool,
        draws: &mut D,
        cancel: Option<&AtomicBool>,
    ) -> Result<AnnealingOutcome, OptimizeError> {
        let config = &self.config;
        let enforce = config.enforce_position_limit.then_some(self.position_limit);
        let mut state = AnnealingState::initialize(ledger, pool, config, enforce, draws)?;

        let mut iterations = 0;
        let mut accepted_moves = 0;
        let mut unchanged_moves = 0;
        let mut improving_moves = 0;
        let mut infeasible_moves = 0;

        let termination = loop {
            if iterations >= config.num_iterations {
                break Termination::IterationBudget;
            }
            if state.temperature() < config.temperature_floor {
                break Termination::TemperatureFloor;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break Termination::Cancelled;
            }

            let step = state.step(ledger, pool, config.cooling_rate, enforce, draws);
            iterations += 1;
            if step.proposed == Move::Unchanged {
                unchanged_moves += 1;
            } else if step.accepted {
                accepted_moves += 1;
            }
            if step.new_best {
                improving_moves += 1;
            }
            if step.infeasible {
                infeasible_moves += 1;
            }
        };

        let initial_profit = state.initial_profit();
        let final_temperature = state.temperature();
        let selection = state.into_best();
        let max_abs_position = selection.max_abs_position(ledger);

        log::debug!(
            "annealing stopped ({:?}) after {} iterations: best {:.2} (initial {:.2}), {} accepted",
            termination,
            iterations,
            selection.profit(),
            initial_profit,
            accepted_moves
        );

        Ok(AnnealingOutcome {
            selection,
            initial_profit,
            iterations,
            accepted_moves,
            unchanged_moves,
            improving_moves,
            infeasible_moves,
            final_temperature,
            termination,
            max_abs_position,
        })
    }
}
