//! Annealing state machine: working set, neighbor moves, and one step.
//!
//! A run is `AnnealingState::initialize`, then repeated `step` calls, then
//! `into_best`. The loop around it (budget, floor, cancellation) lives in
//! [`SimulatedAnnealing`](super::SimulatedAnnealing).

use serde::{Deserialize, Serialize};

use super::config::AnnealingConfig;
use super::decision::{accept, sample_without_replacement, DecisionSource};
use crate::domain::TradeLedger;
use crate::error::OptimizeError;
use crate::feasibility::CandidatePool;
use crate::profit::subset_profit;
use crate::selection::Selection;

/// Probability that a neighbor adds a trade rather than removing one.
pub const ADD_PROBABILITY: f64 = 0.5;

/// The current solution as a set of ledger positions.
///
/// Members are kept sorted and unique. Adding a trade that is already
/// present leaves the set unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    members: Vec<usize>,
}

impl WorkingSet {
    pub fn from_positions(positions: &[usize]) -> Self {
        let mut members = positions.to_vec();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.members.binary_search(&position).is_ok()
    }

    /// Returns false if already present.
    pub fn insert(&mut self, position: usize) -> bool {
        match self.members.binary_search(&position) {
            Ok(_) => false,
            Err(slot) => {
                self.members.insert(slot, position);
                true
            }
        }
    }

    /// Returns false if absent.
    pub fn remove(&mut self, position: usize) -> bool {
        match self.members.binary_search(&position) {
            Ok(slot) => {
                self.members.remove(slot);
                true
            }
            Err(_) => false,
        }
    }

    pub fn profit(&self, ledger: &TradeLedger) -> f64 {
        subset_profit(ledger, &self.members)
    }

    /// Largest absolute running position over the members, in ledger order.
    pub fn max_abs_position(&self, ledger: &TradeLedger) -> f64 {
        let mut position = 0.0_f64;
        let mut peak = 0.0_f64;
        for &p in &self.members {
            position += ledger.trade(p).quantity;
            peak = peak.max(position.abs());
        }
        peak
    }

    pub fn to_selection(&self, profit: f64) -> Selection {
        Selection::from_sorted(self.members.clone(), profit)
    }
}

/// A proposed neighbor, relative to the current solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Add(usize),
    Remove(usize),
    /// Add of a trade already present (or drawn from an empty pool), or a
    /// removal skipped because the solution has a single trade left.
    Unchanged,
}

impl Move {
    /// Draw a neighbor move.
    ///
    /// With [`ADD_PROBABILITY`] add a uniformly drawn candidate; otherwise
    /// remove a uniformly drawn member, unless that would empty the set.
    pub fn propose<D: DecisionSource + ?Sized>(
        current: &WorkingSet,
        pool: &CandidatePool,
        draws: &mut D,
    ) -> Self {
        if draws.unit() < ADD_PROBABILITY {
            if pool.is_empty() {
                return Move::Unchanged;
            }
            let position = pool.at(draws.pick(pool.len()));
            if current.contains(position) {
                Move::Unchanged
            } else {
                Move::Add(position)
            }
        } else if current.len() <= 1 {
            Move::Unchanged
        } else {
            Move::Remove(current.members()[draws.pick(current.len())])
        }
    }

    fn apply(self, set: &mut WorkingSet) {
        match self {
            Move::Add(p) => {
                set.insert(p);
            }
            Move::Remove(p) => {
                set.remove(p);
            }
            Move::Unchanged => {}
        }
    }

    fn revert(self, set: &mut WorkingSet) {
        match self {
            Move::Add(p) => {
                set.remove(p);
            }
            Move::Remove(p) => {
                set.insert(p);
            }
            Move::Unchanged => {}
        }
    }
}

/// What happened in one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub proposed: Move,
    pub delta: f64,
    pub accepted: bool,
    /// The neighbor breached the position limit and was rejected outright.
    pub infeasible: bool,
    pub new_best: bool,
}

/// Per-run mutable state.
#[derive(Debug, Clone)]
pub struct AnnealingState {
    current: WorkingSet,
    current_profit: f64,
    best: WorkingSet,
    best_profit: f64,
    initial_profit: f64,
    temperature: f64,
}

impl AnnealingState {
    /// Draw the initial solution from the pool.
    ///
    /// Fails if the pool cannot supply `initial_sample_size` distinct trades.
    /// With `enforce_limit` set, the sample is trimmed in ledger order to the
    /// trades that keep the running position within the limit; if none do,
    /// the first pool candidate that fits on its own is used instead.
    pub fn initialize<D: DecisionSource + ?Sized>(
        ledger: &TradeLedger,
        pool: &CandidatePool,
        config: &AnnealingConfig,
        enforce_limit: Option<f64>,
        draws: &mut D,
    ) -> Result<Self, OptimizeError> {
        if pool.len() < config.initial_sample_size {
            return Err(OptimizeError::InsufficientCandidates {
                required: config.initial_sample_size,
                available: pool.len(),
            });
        }
        let sample = sample_without_replacement(pool.positions(), config.initial_sample_size, draws);
        let mut solution = WorkingSet::from_positions(&sample);
        if let Some(limit) = enforce_limit {
            solution = feasible_start(ledger, pool, &solution, limit)?;
        }
        Ok(Self::from_solution(ledger, solution, config.initial_temp))
    }

    /// Start from an explicit solution.
    pub fn from_solution(ledger: &TradeLedger, solution: WorkingSet, temperature: f64) -> Self {
        let profit = solution.profit(ledger);
        Self {
            best: solution.clone(),
            current: solution,
            current_profit: profit,
            best_profit: profit,
            initial_profit: profit,
            temperature,
        }
    }

    pub fn current(&self) -> &WorkingSet {
        &self.current
    }

    pub fn current_profit(&self) -> f64 {
        self.current_profit
    }

    pub fn best(&self) -> &WorkingSet {
        &self.best
    }

    pub fn best_profit(&self) -> f64 {
        self.best_profit
    }

    pub fn initial_profit(&self) -> f64 {
        self.initial_profit
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// One iteration: propose, evaluate, accept or reject, track best, cool.
    ///
    /// With `enforce_limit` set, a neighbor that breaches it is rejected
    /// before the acceptance draw, so a feasible start only ever moves
    /// between feasible solutions and `best` stays feasible.
    pub fn step<D: DecisionSource + ?Sized>(
        &mut self,
        ledger: &TradeLedger,
        pool: &CandidatePool,
        cooling_rate: f64,
        enforce_limit: Option<f64>,
        draws: &mut D,
    ) -> StepOutcome {
        let proposed = Move::propose(&self.current, pool, draws);

        // Evaluate the neighbor in place; revert if rejected.
        proposed.apply(&mut self.current);
        let neighbor_profit = self.current.profit(ledger);
        let delta = neighbor_profit - self.current_profit;

        let infeasible = enforce_limit
            .is_some_and(|limit| self.current.max_abs_position(ledger) > limit);
        let accepted = !infeasible && accept(delta, self.temperature, draws);

        if accepted {
            self.current_profit = neighbor_profit;
        } else {
            proposed.revert(&mut self.current);
        }

        let new_best = self.current_profit > self.best_profit;
        if new_best {
            self.best = self.current.clone();
            self.best_profit = self.current_profit;
        }

        self.temperature *= cooling_rate;

        StepOutcome {
            proposed,
            delta,
            accepted,
            infeasible,
            new_best,
        }
    }

    /// Consume the state, keeping only the best solution.
    pub fn into_best(self) -> Selection {
        self.best.to_selection(self.best_profit)
    }
}

/// Keep the members that hold the running position within `limit`, walking
/// in ledger order.
fn feasible_start(
    ledger: &TradeLedger,
    pool: &CandidatePool,
    sample: &WorkingSet,
    limit: f64,
) -> Result<WorkingSet, OptimizeError> {
    let mut kept = WorkingSet::default();
    let mut position = 0.0_f64;
    for &p in sample.members() {
        let next = position + ledger.trade(p).quantity;
        if next.abs() <= limit {
            kept.insert(p);
            position = next;
        }
    }
    if kept.is_empty() {
        let fallback = pool
            .positions()
            .iter()
            .copied()
            .find(|&p| ledger.trade(p).quantity.abs() <= limit)
            .ok_or(OptimizeError::NoFeasibleStart { limit })?;
        kept.insert(fallback);
    }
    Ok(kept)
}
