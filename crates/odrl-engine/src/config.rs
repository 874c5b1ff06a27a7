//! Engine configuration.

use crate::error::{OdrlError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_constraint_depth`.
///
/// serde_json and serde_yaml stop at 128 levels of nesting and every logical
/// constraint level takes two of them, so deeper trees never reach the loader.
pub const DEPTH_CEILING: usize = 48;

/// Default for `max_constraint_depth`.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tunables for a single engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of logical constraints accepted by the loader.
    pub max_constraint_depth: usize,

    /// World key prefix under which duty fulfilment facts are stored.
    pub duty_fact_prefix: String,

    /// Resolve a missing `dateTime` fact from the system clock.
    pub system_clock_fallback: bool,

    /// Turn on debug diagnostics when an engine is created with this config.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_constraint_depth: DEFAULT_MAX_DEPTH,
            duty_fact_prefix: "duty:".to_string(),
            system_clock_fallback: false,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Sets the maximum constraint depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_constraint_depth = depth;
        self
    }

    /// Enables the system clock fallback for `dateTime`.
    pub fn with_system_clock(mut self, enabled: bool) -> Self {
        self.system_clock_fallback = enabled;
        self
    }

    /// Parses a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| OdrlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| OdrlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_constraint_depth == 0 || self.max_constraint_depth > DEPTH_CEILING {
            return Err(OdrlError::Config(format!(
                "max_constraint_depth must be within 1..={}, got {}",
                DEPTH_CEILING, self.max_constraint_depth
            )));
        }
        if self.duty_fact_prefix.is_empty() {
            return Err(OdrlError::Config("duty_fact_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// World key holding the fulfilment state of the duty `uid`.
    pub fn duty_fact_key(&self, uid: &str) -> String {
        format!("{}{}", self.duty_fact_prefix, uid)
    }
}
