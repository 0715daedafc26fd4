// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::record::LogRecord;

pub type PersistOutcome = Result<(), SinkError>;

/// Durable destination for batches of log records.
///
/// The aggregator never calls `persist` concurrently with itself, so implementations do not need
/// to guard against interleaved writes.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persists `batch`, returning one outcome per record in batch order.
    ///
    /// Records without a matching outcome are treated as failed.
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome>;
}
