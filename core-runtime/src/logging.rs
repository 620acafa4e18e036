//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack used by the SDK:
//! - Pretty, JSON, and compact output formats
//! - Module-level filtering via `EnvFilter` syntax
//! - Level selection with a debug-friendly default
//!
//! Token values and credentials are never passed to the logging macros by the
//! auth modules, so no redaction layer is installed here.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("core_auth=debug");
//!
//! init_logging(config).expect("Failed to initialize logging");
//!
//! tracing::info!("SDK initialized");
//! ```

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level when no filter string is given
    pub level: Level,
    /// Custom filter string (e.g., "core_auth=debug,core_runtime=trace")
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set an `EnvFilter`-style filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the filter
/// string fails to parse.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match &config.filter {
        Some(spec) => EnvFilter::try_new(spec)
            .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", spec, e)))?,
        None => EnvFilter::try_new(config.level.to_string())
            .map_err(|e| Error::Config(format!("Invalid log level: {}", e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.display_target);

    let init_result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    init_result.map_err(|e| Error::Internal(format!("Failed to install subscriber: {}", e)))
}
