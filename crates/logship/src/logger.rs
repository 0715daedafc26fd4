// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::console::Console;
use crate::record::{LogRecord, LogRecordBuilder, Severity};

#[derive(Clone)]
enum Destination {
    Console(Arc<dyn Console>),
    Buffered(Arc<Aggregator>),
}

/// Application-facing handle that stamps records with this process's origin and routes them.
///
/// Cheap to clone; pass it to every component that logs.
#[derive(Clone)]
pub struct Logger {
    destination: Destination,
    origin: Arc<str>,
}

impl Logger {
    /// Writes every record immediately to `console`.
    pub fn console(console: Arc<dyn Console>, origin: impl Into<Arc<str>>) -> Self {
        Self {
            destination: Destination::Console(console),
            origin: origin.into(),
        }
    }

    /// Submits every record to `aggregator`.
    pub fn buffered(aggregator: Arc<Aggregator>, origin: impl Into<Arc<str>>) -> Self {
        Self {
            destination: Destination::Buffered(aggregator),
            origin: origin.into(),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Starts a record carrying this logger's origin.
    pub fn record(
        &self,
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> LogRecordBuilder {
        LogRecord::builder(severity, category, message).origin(self.origin.as_ref())
    }

    /// Never fails, whatever the destination.
    pub fn emit(&self, record: LogRecord) {
        match &self.destination {
            Destination::Console(console) => {
                console.emit(record.severity(), record.message(), &record.context())
            }
            Destination::Buffered(aggregator) => aggregator.submit(record),
        }
    }

    pub fn debug(&self, category: impl Into<String>, message: impl Into<String>) {
        self.emit(self.record(Severity::Debug, category, message).build());
    }

    pub fn info(&self, category: impl Into<String>, message: impl Into<String>) {
        self.emit(self.record(Severity::Info, category, message).build());
    }

    pub fn warn(&self, category: impl Into<String>, message: impl Into<String>) {
        self.emit(self.record(Severity::Warn, category, message).build());
    }

    pub fn error(&self, category: impl Into<String>, message: impl Into<String>) {
        self.emit(self.record(Severity::Error, category, message).build());
    }

    pub fn fatal(&self, category: impl Into<String>, message: impl Into<String>) {
        self.emit(self.record(Severity::Fatal, category, message).build());
    }
}
