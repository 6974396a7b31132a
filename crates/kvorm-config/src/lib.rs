//! Runtime configuration for kvorm sessions.
//!
//! Configuration is plain data: it is parsed once (usually from a TOML file at
//! startup) and then borrowed by every session. Nothing here talks to storage.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// KvormConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KvormConfig {
    pub ids: IdConfig,
    pub observability: ObservabilityConfig,
}

impl KvormConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    /// Shorthand for a default config using sequential ids.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            ids: IdConfig {
                strategy: IdStrategy::Sequence,
            },
            ..Self::default()
        }
    }
}

///
/// IdConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdConfig {
    pub strategy: IdStrategy,
}

///
/// IdStrategy
///
/// How a record without an id is assigned one on first save.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Lexicographically sortable random ids, unique without a store round-trip.
    #[default]
    Ulid,

    /// Decimal ids drawn from the per-type `<type>:next_id` counter.
    Sequence,
}

///
/// ObservabilityConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

///
/// TESTS
///
