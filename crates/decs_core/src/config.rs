//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field is optional:
//!
//! ```toml
//! entity_capacity = 4096
//! profiler = "clock"
//! log_execution_order = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DecsError, DecsResult};
use crate::perf::ProfilerKind;

/// Default entity reservation.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Entities reserved up front in the table and in every column.
    pub entity_capacity: usize,
    /// Measurement backend.
    pub profiler: ProfilerKind,
    /// Log the execution order whenever the plan is rebuilt.
    pub log_execution_order: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            profiler: ProfilerKind::None,
            log_execution_order: false,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> DecsResult<Self> {
        toml::from_str(text).map_err(|err| DecsError::InvalidConfig(err.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidConfig` if it does
    /// not parse.
    pub fn load(path: impl AsRef<Path>) -> DecsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if serialization fails.
    pub fn to_toml_string(&self) -> DecsResult<String> {
        toml::to_string(self).map_err(|err| DecsError::InvalidConfig(err.to_string()))
    }
}
