// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors returned by the aggregator lifecycle operations.
///
/// None of these ever reach the caller of [`crate::Aggregator::submit`].
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Aggregator must be started from within a tokio runtime")]
    NoRuntime,

    #[error("Aggregator not running")]
    NotRunning,

    #[error("Shutdown timeout exceeded, {abandoned} records abandoned")]
    ShutdownTimeout { abandoned: usize },

    #[error("Final flush aborted, {abandoned} records abandoned")]
    FinalFlushAborted { abandoned: usize },
}

/// Reason a single record could not be persisted by a sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to serialize record: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Destination error: {status:?} {message}")]
    Destination {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to prepare payload: {0}")]
    Payload(String),

    #[error("Sink reported no outcome for record")]
    MissingOutcome,

    #[error("Failed to create sink: {0}")]
    Setup(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Unknown sink kind: {0}")]
    UnknownSinkKind(String),
}
