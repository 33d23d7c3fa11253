//! # Logging Setup
//!
//! Installs a `tracing-subscriber` stack for binaries and tests. The library
//! itself only emits `tracing` events; nothing is printed unless a subscriber
//! is installed.
//!
//! ## Environment Variables
//!
//! - `RADIX_LOG_LEVEL` - `trace`, `debug`, `info` (default), `warn`, `error`
//! - `RADIX_LOG_FORMAT` - `json` (default) or `pretty`
//! - `RADIX_LOG_ASYNC` - `true` writes through a background thread
//!   (`tracing-appender`); default `false`
//! - `RADIX_LOG_FILTER` - extra comma-separated directives, e.g.
//!   `radix_dispatch::router=debug`
//!
//! `RUST_LOG`, when set, replaces the level from `RADIX_LOG_LEVEL`.
//!
//! Logs go to stderr so command output on stdout stays machine readable.

use anyhow::{Context as _, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` is JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub async_logging: bool,
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            async_logging: false,
            filter: None,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup("RADIX_LOG_LEVEL")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.level),
            format: lookup("RADIX_LOG_FORMAT").map_or(defaults.format, |s| LogFormat::parse(&s)),
            async_logging: lookup("RADIX_LOG_ASYNC")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.async_logging),
            filter: lookup("RADIX_LOG_FILTER").filter(|s| !s.trim().is_empty()),
        }
    }

    /// Human friendly settings for local runs
    #[must_use]
    pub fn dev() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            async_logging: false,
            filter: None,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        if let Some(extra) = &self.filter {
            for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("Warning: invalid log filter directive '{directive}': {e}"),
                }
            }
        }
        filter
    }
}

/// Keeps the background writer alive; drop it last to flush buffered logs
#[must_use = "dropping the guard stops asynchronous logging"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let (writer, worker) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        LogConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), LogConfig::default());
    }

    #[test]
    fn test_from_lookup() {
        let cfg = config(&[
            ("RADIX_LOG_LEVEL", "debug"),
            ("RADIX_LOG_FORMAT", "Pretty"),
            ("RADIX_LOG_ASYNC", "true"),
            ("RADIX_LOG_FILTER", "radix_dispatch::router=trace"),
        ]);
        assert_eq!(cfg.level, Level::DEBUG);
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert!(cfg.async_logging);
        assert_eq!(cfg.filter.as_deref(), Some("radix_dispatch::router=trace"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[("RADIX_LOG_LEVEL", "loud"), ("RADIX_LOG_ASYNC", "sometimes")]);
        assert_eq!(cfg.level, Level::INFO);
        assert!(!cfg.async_logging);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }
}
