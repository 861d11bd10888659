//! Configuration loading and defaults for idle-shutdownd.
//!
//! The config file is a plain `Key: value` list:
//!
//! ```text
//! MaxIdleTime: 45
//! Verbose: true
//! ```
//!
//! Each setting falls back to its default on its own when missing or malformed,
//! and a missing file yields all defaults.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::IdleThreshold;

/// Problems reading the config file. Always recovered by using defaults.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed value for {key}: {value:?}")]
    Malformed { key: &'static str, value: String },
}

/// Effective configuration. Immutable once loaded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Minutes of inactivity before the shutdown warning (default: 90).
    pub max_idle_time: u64,

    /// Also write every idle sample to the event log (default: false).
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_idle_time: IdleThreshold::default().minutes(),
            verbose: false,
        }
    }
}

impl Config {
    /// The idle threshold as a domain value.
    pub fn threshold(&self) -> IdleThreshold {
        IdleThreshold::from_minutes(self.max_idle_time).unwrap_or_default()
    }

    /// Load configuration from the given path or the default location.
    ///
    /// Never fails: unreadable files and bad values fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_path) else {
            debug!("No config directory available, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Loading config from {}", path.display());
                Self::parse(&content)
            }
            Err(e) => {
                let err = ConfigError::Unavailable(format!("{}: {}", path.display(), e));
                debug!("{}, using defaults", err);
                Self::default()
            }
        }
    }

    /// Parse `Key: value` lines. The first occurrence of a key wins.
    pub fn parse(content: &str) -> Self {
        let mut max_idle_time: Option<u64> = None;
        let mut verbose: Option<bool> = None;

        for line in content.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match normalize_key(key).as_str() {
                "maxidletime" if max_idle_time.is_none() => {
                    max_idle_time = Some(parse_minutes(value).unwrap_or_else(|e| {
                        debug!("{}, using default", e);
                        Self::default().max_idle_time
                    }));
                }
                "verbose" if verbose.is_none() => {
                    verbose = Some(parse_flag(value).unwrap_or_else(|e| {
                        debug!("{}, using default", e);
                        false
                    }));
                }
                _ => {}
            }
        }

        let defaults = Self::default();
        Self {
            max_idle_time: max_idle_time.unwrap_or(defaults.max_idle_time),
            verbose: verbose.unwrap_or(defaults.verbose),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Default config path: `$XDG_CONFIG_HOME/idle-shutdownd/config.txt`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("idle-shutdownd").join("config.txt"))
}

/// Lowercase and drop whitespace so "Max Idle Time" matches "MaxIdleTime".
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_minutes(value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .ok()
        .and_then(IdleThreshold::from_minutes)
        .map(IdleThreshold::minutes)
        .ok_or_else(|| ConfigError::Malformed {
            key: "MaxIdleTime",
            value: value.to_string(),
        })
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::Malformed {
            key: "Verbose",
            value: value.to_string(),
        }),
    }
}
