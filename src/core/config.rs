/*!
 * Kernel Configuration
 *
 * Runtime configuration for the MLFQ scheduler and the simulated machine.
 * Values come from defaults, an optional JSON file, then environment overrides.
 */

use super::errors::ConfigError;
use super::types::Level;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMicroSeconds, DurationMilliSeconds};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable overriding the core count
pub const ENV_CORES: &str = "MLFQ_CORES";
/// Environment variable overriding the boost interval (milliseconds)
pub const ENV_BOOST_INTERVAL_MS: &str = "MLFQ_BOOST_INTERVAL_MS";
/// Environment variable overriding the micro-quantum cap (milliseconds)
pub const ENV_MICRO_QUANTUM_MS: &str = "MLFQ_MICRO_QUANTUM_MS";

/// MLFQ scheduling parameters
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of priority levels
    pub levels: usize,
    /// Fixed quantum of the top (interactive) level
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "top_quantum_ms")]
    pub top_quantum: Duration,
    /// Quantum used while the burst estimate is uninitialized
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "default_quantum_ms")]
    pub default_quantum: Duration,
    /// Estimate multipliers for levels 1..levels, ascending
    pub multipliers: Vec<f64>,
    /// Upper bound of one micro-quantum slice
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "micro_quantum_max_ms")]
    pub micro_quantum_max: Duration,
    /// Wait before a demoted process is boosted back to the top level
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "boost_interval_ms")]
    pub boost_interval: Duration,
    /// Estimator weight for samples above the current estimate
    pub alpha_rise: f64,
    /// Estimator weight for samples below the current estimate
    pub alpha_fall: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            levels: 4,
            top_quantum: Duration::from_millis(10),
            default_quantum: Duration::from_millis(125),
            multipliers: vec![0.6, 1.1, 1.6],
            micro_quantum_max: Duration::from_millis(120),
            boost_interval: Duration::from_secs(3),
            alpha_rise: 0.4,
            alpha_fall: 0.1,
        }
    }
}

impl SchedulerConfig {
    /// Lowest priority level
    #[inline(always)]
    pub fn lowest_level(&self) -> Level {
        self.levels.saturating_sub(1)
    }

    /// Multiplier applied to the burst estimate at `level` (level 0 has none)
    #[inline]
    pub fn multiplier(&self, level: Level) -> Option<f64> {
        level
            .checked_sub(1)
            .and_then(|index| self.multipliers.get(index).copied())
    }

    /// Largest configured multiplier
    pub fn max_multiplier(&self) -> f64 {
        self.multipliers.iter().copied().fold(0.0, f64::max)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels == 0 {
            return Err(ConfigError::NoLevels);
        }

        let expected = self.levels - 1;
        if self.multipliers.len() != expected {
            return Err(ConfigError::MultiplierCount {
                levels: self.levels,
                expected,
                found: self.multipliers.len(),
            });
        }

        let mut previous = 0.0;
        for (index, &value) in self.multipliers.iter().enumerate() {
            let level = index + 1;
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidMultiplier { level, value });
            }
            if value < previous {
                return Err(ConfigError::NonMonotonicMultipliers { level });
            }
            previous = value;
        }

        for (name, duration) in [
            ("top_quantum_ms", self.top_quantum),
            ("default_quantum_ms", self.default_quantum),
            ("micro_quantum_max_ms", self.micro_quantum_max),
            ("boost_interval_ms", self.boost_interval),
        ] {
            if duration.is_zero() {
                return Err(ConfigError::ZeroDuration(name.to_string()));
            }
        }

        for (name, value) in [("alpha_rise", self.alpha_rise), ("alpha_fall", self.alpha_fall)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidAlpha {
                    name: name.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Simulated machine parameters
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated cores (one worker each)
    pub cores: usize,
    /// Cost charged when a core switches to a different process
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "context_switch_ms")]
    pub context_switch: Duration,
    /// Wall-clock length of one trace time unit
    #[serde_as(as = "DurationMicroSeconds<u64>")]
    #[serde(rename = "time_unit_us")]
    pub time_unit: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cores: 2,
            context_switch: Duration::from_millis(20),
            time_unit: Duration::from_millis(1),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cores == 0 {
            return Err(ConfigError::NoCores);
        }
        if self.time_unit.is_zero() {
            return Err(ConfigError::ZeroDuration("time_unit_us".to_string()));
        }
        Ok(())
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub scheduler: SchedulerConfig,
    pub simulation: SimulationConfig,
}

impl KernelConfig {
    /// Parse configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CORES) {
            self.simulation.cores = parse_env(ENV_CORES, &value)?;
        }
        if let Some(value) = lookup(ENV_BOOST_INTERVAL_MS) {
            self.scheduler.boost_interval =
                Duration::from_millis(parse_env(ENV_BOOST_INTERVAL_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_MICRO_QUANTUM_MS) {
            self.scheduler.micro_quantum_max =
                Duration::from_millis(parse_env(ENV_MICRO_QUANTUM_MS, &value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.simulation.validate()
    }
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var: var.to_string(),
        reason: e.to_string(),
    })
}
