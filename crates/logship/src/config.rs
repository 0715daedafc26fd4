// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, DEFAULT_HTTP_TIMEOUT, DEFAULT_LOG_LEVEL,
    DEFAULT_ORIGIN, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::errors::{AggregatorError, ParseError};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Batching policy of an [`crate::Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Buffer length that triggers an immediate flush
    pub batch_size: usize,
    /// Period of the background flush timer
    pub flush_interval: Duration,
    /// How long shutdown waits for the final flush
    pub shutdown_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl AggregatorConfig {
    #[must_use]
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            batch_size,
            flush_interval,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AggregatorError> {
        if self.batch_size == 0 {
            return Err(AggregatorError::InvalidConfig(
                "batch size must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(AggregatorError::InvalidConfig(
                "flush interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Written immediately to the console, no batching
    Console,
    /// Appended as JSON lines to a file
    File(PathBuf),
    /// Posted as JSON arrays to an HTTP endpoint
    Http {
        url: String,
        timeout: Duration,
        /// zstd level, no compression when unset
        compression_level: Option<i32>,
        https_proxy: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
    Http,
}

impl FromStr for SinkKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" | "stdout" => Ok(SinkKind::Console),
            "file" => Ok(SinkKind::File),
            "http" | "https" => Ok(SinkKind::Http),
            _ => Err(ParseError::UnknownSinkKind(s.to_string())),
        }
    }
}

/// Configuration of the shipping agent, read from `LOGSHIP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipperConfig {
    pub aggregator: AggregatorConfig,
    pub sink: SinkTarget,
    /// Origin tag stamped on every record
    pub origin: String,
    /// Log level of the agent's own diagnostics (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            sink: SinkTarget::Console,
            origin: DEFAULT_ORIGIN.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AggregatorError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AggregatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|val| val.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_millis)
        };

        let aggregator = AggregatorConfig {
            batch_size: lookup("LOGSHIP_BATCH_SIZE")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
            flush_interval: millis("LOGSHIP_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL),
            shutdown_timeout: millis("LOGSHIP_SHUTDOWN_TIMEOUT_MS", DEFAULT_SHUTDOWN_TIMEOUT),
        };

        let kind = match lookup("LOGSHIP_SINK") {
            Some(val) => val
                .parse::<SinkKind>()
                .map_err(|e| AggregatorError::InvalidConfig(e.to_string()))?,
            None => SinkKind::Console,
        };

        let sink = match kind {
            SinkKind::Console => SinkTarget::Console,
            SinkKind::File => SinkTarget::File(
                lookup("LOGSHIP_FILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            ),
            SinkKind::Http => SinkTarget::Http {
                url: lookup("LOGSHIP_URL").unwrap_or_default(),
                timeout: millis("LOGSHIP_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT),
                compression_level: lookup("LOGSHIP_COMPRESSION_LEVEL")
                    .and_then(|val| val.trim().parse::<i32>().ok()),
                https_proxy: lookup("LOGSHIP_PROXY_HTTPS").or_else(|| lookup("HTTPS_PROXY")),
            },
        };

        let config = Self {
            aggregator,
            sink,
            origin: lookup("LOGSHIP_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            log_level: lookup("LOGSHIP_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AggregatorError> {
        self.aggregator.validate()?;

        if self.origin.trim().is_empty() {
            return Err(AggregatorError::InvalidConfig(
                "LOGSHIP_ORIGIN cannot be empty".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(AggregatorError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        match &self.sink {
            SinkTarget::Console => {}
            SinkTarget::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(AggregatorError::InvalidConfig(
                        "LOGSHIP_FILE_PATH is required for the file sink".to_string(),
                    ));
                }
            }
            SinkTarget::Http {
                url,
                compression_level,
                ..
            } => {
                if url.trim().is_empty() {
                    return Err(AggregatorError::InvalidConfig(
                        "LOGSHIP_URL is required for the http sink".to_string(),
                    ));
                }
                if let Some(level) = compression_level {
                    if !zstd::compression_level_range().contains(level) {
                        return Err(AggregatorError::InvalidConfig(format!(
                            "Invalid compression level {level}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
