//! Scope configuration

use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};

/// Environment variable switching strict mode on
pub const STRICT_ENV_VAR: &str = "GANTRY_CLASSLOADER_SCOPE_STRICT";

/// Class loader scope configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Fail instead of warning when a loader is requested before lock
    pub strict: bool,
}

impl ScopeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With strict mode
    #[inline]
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns [`ScopeError::Config`] if the text does not describe a config
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ScopeError::Config {
            reason: e.to_string(),
        })
    }

    /// Read strict mode from [`STRICT_ENV_VAR`]
    #[must_use]
    pub fn from_env() -> Self {
        let strict = std::env::var(STRICT_ENV_VAR).map_or(false, |value| parse_flag(&value));
        Self { strict }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
