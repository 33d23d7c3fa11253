//! # Dispatch Configuration
//!
//! Settings that shape the dispatcher at build time. Values come from, in
//! increasing precedence: built-in defaults, a YAML file (or the `debug` and
//! `pool` keys of a route table), and environment variables.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `RADIX_DEBUG` | `debug` | `false` |
//! | `RADIX_POOL_MAX_IDLE` | `pool.max_idle` | `1024` |
//! | `RADIX_POOL_PREWARM` | `pool.prewarm` | `0` |
//! | `RADIX_STACK_SIZE` | `stack_size` | `0x4000` |
//!
//! `RADIX_STACK_SIZE` accepts decimal (`32768`) or hexadecimal (`0x8000`).
//! Unparseable values are ignored with a warning.
//!
//! ## Debug mode
//!
//! In debug mode the default error handler sends the text of unexpected
//! errors to the client instead of a generic `Internal Server Error`.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::warn;

const DEFAULT_MAX_IDLE: usize = 1024;
const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Context pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle contexts kept for reuse; extra released contexts are dropped
    pub max_idle: usize,
    /// Contexts allocated up front when the pool is created
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
            prewarm: 0,
        }
    }
}

/// Top-level dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub debug: bool,
    pub pool: PoolConfig,
    /// Stack size in bytes for coroutines spawned by the load driver
    pub stack_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            debug: false,
            pool: PoolConfig::default(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Parse a YAML document; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid dispatch configuration")
    }

    /// Load a YAML file and apply environment overrides on top
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from any key/value source (the environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RADIX_DEBUG") {
            match parse_bool(&v) {
                Some(debug) => self.debug = debug,
                None => warn!(value = %v, "Ignoring invalid RADIX_DEBUG"),
            }
        }
        if let Some(v) = lookup("RADIX_POOL_MAX_IDLE") {
            match v.trim().parse() {
                Ok(n) => self.pool.max_idle = n,
                Err(_) => warn!(value = %v, "Ignoring invalid RADIX_POOL_MAX_IDLE"),
            }
        }
        if let Some(v) = lookup("RADIX_POOL_PREWARM") {
            match v.trim().parse() {
                Ok(n) => self.pool.prewarm = n,
                Err(_) => warn!(value = %v, "Ignoring invalid RADIX_POOL_PREWARM"),
            }
        }
        if let Some(v) = lookup("RADIX_STACK_SIZE") {
            match parse_size(&v) {
                Some(n) => self.stack_size = n,
                None => warn!(value = %v, "Ignoring invalid RADIX_STACK_SIZE"),
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> DispatchConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = DispatchConfig::default();
        config.apply_overrides(|key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert!(!config.debug);
        assert_eq!(config.pool.max_idle, 1024);
        assert_eq!(config.pool.prewarm, 0);
        assert_eq!(config.stack_size, 0x4000);
    }

    #[test]
    fn test_env_overrides() {
        let config = overrides(&[
            ("RADIX_DEBUG", "true"),
            ("RADIX_POOL_MAX_IDLE", "16"),
            ("RADIX_POOL_PREWARM", "4"),
            ("RADIX_STACK_SIZE", "0x8000"),
        ]);
        assert!(config.debug);
        assert_eq!(config.pool, PoolConfig { max_idle: 16, prewarm: 4 });
        assert_eq!(config.stack_size, 0x8000);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let config = overrides(&[("RADIX_DEBUG", "maybe"), ("RADIX_POOL_MAX_IDLE", "lots")]);
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = DispatchConfig::from_yaml_str("debug: true\npool:\n  prewarm: 8\n").unwrap();
        assert!(config.debug);
        assert_eq!(config.pool.prewarm, 8);
        assert_eq!(config.pool.max_idle, 1024);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size("big"), None);
    }
}
