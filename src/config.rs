//! Engine settings.
//!
//! Every field has a default; a TOML file only needs the values it changes:
//!
//! ```toml
//! pairing_strategy = "exploration"
//! elo_proximity_power = 0.5
//! ```

use crate::history::{MAX_HISTORY_KEEP, MAX_UNDO_STACK};
use crate::sampler::{
    PairingStrategy, SamplerParams, DEFAULT_ELO_PROXIMITY_POWER, DEFAULT_EXPLORATION_POWER,
    DEFAULT_MAX_ATTEMPTS,
};

pub const DEFAULT_RECALCULATION_MAX_PASSES: usize = 100;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub pairing_strategy: PairingStrategy,
    pub elo_proximity_power: f64,
    pub exploration_power: f64,
    pub max_attempts: usize,
    pub history_cap: usize,
    pub undo_cap: usize,
    pub recalculation_max_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pairing_strategy: PairingStrategy::default(),
            elo_proximity_power: DEFAULT_ELO_PROXIMITY_POWER,
            exploration_power: DEFAULT_EXPLORATION_POWER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            history_cap: MAX_HISTORY_KEEP,
            undo_cap: MAX_UNDO_STACK,
            recalculation_max_passes: DEFAULT_RECALCULATION_MAX_PASSES,
        }
    }
}

impl EngineConfig {
    /// Replaces negative or non-finite powers and zero capacities with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = EngineConfig::default();
        if !valid_power(self.elo_proximity_power) {
            tracing::warn!(value = self.elo_proximity_power, "invalid elo_proximity_power, using default");
            self.elo_proximity_power = defaults.elo_proximity_power;
        }
        if !valid_power(self.exploration_power) {
            tracing::warn!(value = self.exploration_power, "invalid exploration_power, using default");
            self.exploration_power = defaults.exploration_power;
        }
        if self.history_cap == 0 {
            self.history_cap = defaults.history_cap;
        }
        if self.undo_cap == 0 {
            self.undo_cap = defaults.undo_cap;
        }
        if self.recalculation_max_passes == 0 {
            self.recalculation_max_passes = defaults.recalculation_max_passes;
        }
        self
    }

    pub fn sampler_params(&self) -> SamplerParams {
        SamplerParams {
            strategy: self.pairing_strategy,
            exploration_power: self.exploration_power,
            elo_proximity_power: self.elo_proximity_power,
            max_attempts: self.max_attempts,
        }
    }
}

pub(crate) fn valid_power(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(feature = "serde")]
impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, crate::RankingError> {
        toml::from_str::<EngineConfig>(content)
            .map(EngineConfig::sanitized)
            .map_err(|e| crate::RankingError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Loads a config file; a missing file yields the defaults.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::RankingError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
            Err(e) => Err(crate::RankingError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
