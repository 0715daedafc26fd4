// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock sinks and consoles for testing

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use logship::{Console, LogRecord, PersistOutcome, RecordSink, Severity, SinkError};
use serde_json::Value;

/// Sink that accepts everything and remembers each batch it was handed
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<LogRecord>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn batches(&self) -> Vec<Vec<LogRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.batches()
            .iter()
            .flatten()
            .map(|r| r.message().to_string())
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RecordSink for RecordingSink {
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome> {
        self.batches.lock().unwrap().push(batch.to_vec());
        vec![Ok(()); batch.len()]
    }
}

/// Sink that rejects records whose message is in `rejected`
#[allow(dead_code)]
pub struct FailingSink {
    rejected: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FailingSink {
    pub fn rejecting(messages: &[&str]) -> Self {
        Self {
            rejected: messages.iter().map(|m| m.to_string()).collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Messages of every record this sink was asked to persist, retries included
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordSink for FailingSink {
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome> {
        let mut attempts = self.attempts.lock().unwrap();
        batch
            .iter()
            .map(|record| {
                attempts.push(record.message().to_string());
                if self.rejected.contains(record.message()) {
                    Err(SinkError::Destination {
                        status: Some(500),
                        message: "rejected".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
            .collect()
    }
}

/// Sink that notices when a persist call starts while another is still running
#[derive(Default)]
pub struct InFlightSink {
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    calls: AtomicUsize,
    records: AtomicUsize,
}

#[allow(dead_code)]
impl InFlightSink {
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordSink for InFlightSink {
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_micros(200)).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.fetch_add(batch.len(), Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        vec![Ok(()); batch.len()]
    }
}

/// Console that keeps every emission in memory
#[derive(Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<(Severity, String, Value)>>,
}

#[allow(dead_code)]
impl RecordingConsole {
    pub fn lines(&self) -> Vec<(Severity, String, Value)> {
        self.lines.lock().unwrap().clone()
    }
}

impl Console for RecordingConsole {
    fn emit(&self, severity: Severity, message: &str, context: &Value) {
        self.lines
            .lock()
            .unwrap()
            .push((severity, message.to_string(), context.clone()));
    }
}
