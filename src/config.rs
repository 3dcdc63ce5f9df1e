// Configuration for the element layer
//
// Configuration is resolved in order of precedence:
// 1. Environment variables (highest priority)
// 2. TOML file, when one is given
// 3. Built-in defaults (lowest priority)
//
// The defaults reproduce the stock browser-side behavior:
// `data-repeatable-ref` repeat sources, six-character scope tokens and no
// style de-duplication. The `data-event-` marker prefix is reserved and not
// configurable.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ElementError, Result};

pub const ENV_LOG: &str = "ELEMENT_NATIVE_LOG";
pub const ENV_STYLE_CACHE: &str = "ELEMENT_NATIVE_STYLE_CACHE";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attribute that tags a repeat-source element.
    pub repeat_ref_attribute: String,
    /// Length of the base-36 scope token appended to light-DOM scope attributes.
    pub scope_token_len: usize,
    /// Reference-count scoped style sheets and drop them with their last instance.
    pub style_cache: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repeat_ref_attribute: "data-repeatable-ref".to_string(),
            scope_token_len: 6,
            style_cache: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source).map_err(|e| ElementError::Config {
            reason: e.to_string(),
        })?;
        config.validate()
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ElementError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(level) = std::env::var(ENV_LOG) {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(flag) = std::env::var(ENV_STYLE_CACHE) {
            match parse_flag(&flag) {
                Some(value) => self.style_cache = value,
                None => tracing::warn!(
                    "Ignoring {}={:?}: expected true/false/1/0",
                    ENV_STYLE_CACHE,
                    flag
                ),
            }
        }
    }

    pub(crate) fn validate(self) -> Result<Self> {
        if self.scope_token_len == 0 {
            return Err(ElementError::Config {
                reason: "scope_token_len must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
