//! Annealing schedule configuration.

use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;

/// Parameters of a single annealing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Starting temperature.
    pub initial_temp: f64,
    /// Multiplicative decay applied once per iteration, in `[0, 1)`.
    pub cooling_rate: f64,
    /// Iteration budget.
    pub num_iterations: usize,
    /// The run stops once the temperature drops below this.
    pub temperature_floor: f64,
    /// Size of the random initial solution drawn from the candidate pool.
    pub initial_sample_size: usize,
    /// Reject neighbors whose running position breaches the limit.
    pub enforce_position_limit: bool,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temp: 1000.0,
            cooling_rate: 0.995,
            num_iterations: 1000,
            temperature_floor: 1e-5,
            initial_sample_size: 10,
            enforce_position_limit: false,
        }
    }
}

impl AnnealingConfig {
    /// Same schedule with a different temperature, cooling rate, and budget.
    ///
    /// This is the shape of a grid point in the parameter search.
    pub fn with_schedule(&self, initial_temp: f64, cooling_rate: f64, num_iterations: usize) -> Self {
        Self {
            initial_temp,
            cooling_rate,
            num_iterations,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), OptimizeError> {
        if !self.initial_temp.is_finite() || self.initial_temp < 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "initial_temp must be finite and >= 0, got {}",
                self.initial_temp
            )));
        }
        if !(0.0..1.0).contains(&self.cooling_rate) {
            return Err(OptimizeError::InvalidConfig(format!(
                "cooling_rate must be in [0, 1), got {}",
                self.cooling_rate
            )));
        }
        if !self.temperature_floor.is_finite() || self.temperature_floor < 0.0 {
            return Err(OptimizeError::InvalidConfig(format!(
                "temperature_floor must be finite and >= 0, got {}",
                self.temperature_floor
            )));
        }
        if self.initial_sample_size == 0 {
            return Err(OptimizeError::InvalidConfig(
                "initial_sample_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
