//! Serializable optimizer configuration.
//!
//! One TOML file drives every command. All sections are optional and
//! missing keys take their defaults:
//!
//! ```toml
//! seed = 42
//!
//! [selection]
//! position_limit = 100000.0
//!
//! [annealing]
//! initial_temp = 1000.0
//! cooling_rate = 0.995
//! num_iterations = 1000
//!
//! [search]
//! initial_temp = { start = 500.0, stop = 5500.0, step = 500.0 }
//!
//! [multi_run]
//! num_runs = 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradeselect_core::annealing::AnnealingConfig;
use tradeselect_core::greedy::GreedyRanking;
use tradeselect_core::DEFAULT_POSITION_LIMIT;

use crate::sweep::AxisRange;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for every optimizer command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Master seed for the RNG hierarchy.
    pub seed: u64,
    pub selection: SelectionConfig,
    pub annealing: AnnealingConfig,
    pub greedy: GreedyConfig,
    pub search: SearchConfig,
    pub multi_run: MultiRunConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            selection: SelectionConfig::default(),
            annealing: AnnealingConfig::default(),
            greedy: GreedyConfig::default(),
            search: SearchConfig::default(),
            multi_run: MultiRunConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limit = self.selection.position_limit;
        if limit.is_nan() || limit <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "selection.position_limit must be > 0, got {limit}"
            )));
        }
        self.annealing
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.search.validate()?;
        if self.multi_run.num_runs == 0 {
            return Err(ConfigError::Invalid(
                "multi_run.num_runs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Position constraint shared by every selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub position_limit: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            position_limit: DEFAULT_POSITION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    pub ranking: GreedyRanking,
}

/// Grid axes for the parameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub parallel: bool,
    pub initial_temp: AxisRange,
    pub cooling_rate: AxisRange,
    pub num_iterations: AxisRange,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            initial_temp: AxisRange::new(500.0, 5500.0, 500.0),
            cooling_rate: AxisRange::new(0.990, 0.999, 0.001),
            num_iterations: AxisRange::new(500.0, 5500.0, 500.0),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, axis) in [
            ("initial_temp", &self.initial_temp),
            ("cooling_rate", &self.cooling_rate),
            ("num_iterations", &self.num_iterations),
        ] {
            axis.validate()
                .map_err(|msg| ConfigError::Invalid(format!("search.{name}: {msg}")))?;
        }
        if self.cooling_rate.start < 0.0 || self.cooling_rate.values().iter().any(|&c| c >= 1.0) {
            return Err(ConfigError::Invalid(
                "search.cooling_rate values must lie in [0, 1)".into(),
            ));
        }
        if self.initial_temp.start < 0.0 || self.num_iterations.start < 0.0 {
            return Err(ConfigError::Invalid(
                "search.initial_temp and search.num_iterations must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiRunConfig {
    pub num_runs: usize,
    pub parallel: bool,
}

impl Default for MultiRunConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = OptimizerConfig::from_toml("").unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert_eq!(config.selection.position_limit, 100_000.0);
        assert_eq!(config.multi_run.num_runs, 100);
        assert_eq!(config.annealing.temperature_floor, 1e-5);
        assert_eq!(config.annealing.initial_sample_size, 10);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config = OptimizerConfig::from_toml(
            r#"
seed = 7

[selection]
position_limit = 500.0

[annealing]
initial_temp = 2500.0

[greedy]
ranking = "profit"

[search]
cooling_rate = { start = 0.95, stop = 0.97, step = 0.01 }
parallel = false
"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.selection.position_limit, 500.0);
        assert_eq!(config.annealing.initial_temp, 2500.0);
        assert_eq!(config.annealing.cooling_rate, 0.995);
        assert_eq!(config.greedy.ranking, GreedyRanking::Profit);
        assert_eq!(config.search.cooling_rate.values(), vec![0.95, 0.96]);
        assert!(!config.search.parallel);
        assert_eq!(config.search.initial_temp, SearchConfig::default().initial_temp);
    }

    #[test]
    fn rejects_bad_cooling_rate() {
        let err = OptimizerConfig::from_toml("[annealing]\ncooling_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_cooling_axis_reaching_one() {
        let err = OptimizerConfig::from_toml(
            "[search]\ncooling_rate = { start = 0.99, stop = 1.02, step = 0.01 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_runs() {
        let err = OptimizerConfig::from_toml("[multi_run]\nnum_runs = 0\n").unwrap_err();
        assert!(err.to_string().contains("num_runs"));
    }

    #[test]
    fn rejects_non_positive_limit() {
        let err = OptimizerConfig::from_toml("[selection]\nposition_limit = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unparseable_toml() {
        let err = OptimizerConfig::from_toml("seed = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = OptimizerConfig::from_file(Path::new("/nonexistent/tradeselect.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = OptimizerConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back = OptimizerConfig::from_toml(&text).unwrap();
        assert_eq!(config, back);
    }
}
