// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered batching of log records.
//!
//! The [`Aggregator`] accepts records from any number of producers and forwards them to a
//! [`RecordSink`] in batches of at most `batch_size` records. Two triggers start a flush:
//!
//! - **Size**: the append that brings the buffer to `batch_size` spawns a flush on the runtime,
//!   unless one is already scheduled and has not yet taken its snapshot.
//! - **Time**: a background task flushes every `flush_interval`.
//!
//! A flush first takes the flush permit, which serializes all sink writes, then swaps the buffer
//! out under the buffer lock and releases it before any I/O. Producers therefore only ever wait
//! for a `Vec::push` or a `mem::take`.
//!
//! # Failure isolation
//!
//! Records the sink fails to persist are reported once to the [`Console`] and dropped. They are
//! never retried or re-enqueued, and nothing is reported back to the producer. A flush that
//! unwinds or is dropped before settling its snapshot counts the unsettled records as dropped.
//!
//! # Shutdown
//!
//! [`Aggregator::shutdown`] stops the timer, runs one final flush and waits for it up to a
//! timeout. When the timeout expires, in-progress sink calls are abandoned and every record not
//! yet persisted is counted as dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::AggregatorConfig;
use crate::console::Console;
use crate::errors::{AggregatorError, SinkError};
use crate::record::{LogRecord, Severity};
use crate::sink::{PersistOutcome, RecordSink};

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of an [`Aggregator`]. There is no way back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Running,
    Stopping,
    Stopped,
}

/// Counters accumulated since the aggregator started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Records accepted into the buffer
    pub submitted: u64,
    /// Records the sink reported as persisted
    pub persisted: u64,
    /// Records lost to sink failures or shutdown abandonment
    pub dropped: u64,
    /// Flushes that found at least one record
    pub flushes: u64,
}

struct Shared {
    buffer: Mutex<Vec<LogRecord>>,
    flush_permit: TokioMutex<()>,
    /// Set while a size-triggered flush is pending and has not taken its snapshot yet
    flush_scheduled: AtomicBool,
    batch_size: usize,
    sink: Arc<dyn RecordSink>,
    console: Arc<dyn Console>,
    state: AtomicU8,
    abandon_token: CancellationToken,
    submitted: AtomicU64,
    persisted: AtomicU64,
    dropped: AtomicU64,
    abandoned: AtomicU64,
    flushes: AtomicU64,
}

impl Shared {
    fn buffer(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forwards everything currently buffered to the sink and returns the number of records taken.
    ///
    /// `scheduled` marks the size-triggered flush, which releases the schedule mark when it takes
    /// its snapshot.
    async fn flush(&self, scheduled: bool) -> usize {
        let _permit = self.flush_permit.lock().await;
        let snapshot = {
            let mut buffer = self.buffer();
            if scheduled {
                self.flush_scheduled.store(false, Ordering::Release);
            }
            if self.abandon_token.is_cancelled() {
                return 0;
            }
            std::mem::take(&mut *buffer)
        };
        if snapshot.is_empty() {
            return 0;
        }

        let total = snapshot.len();
        self.flushes.fetch_add(1, Ordering::Relaxed);
        debug!("Flushing {total} log records");

        let mut unsettled = Unsettled {
            shared: self,
            remaining: total,
        };
        for chunk in snapshot.chunks(self.batch_size) {
            let outcomes = tokio::select! {
                biased;
                () = self.abandon_token.cancelled() => None,
                outcomes = self.sink.persist(chunk) => Some(outcomes),
            };

            match outcomes {
                Some(outcomes) => {
                    self.settle(chunk, outcomes);
                    unsettled.remaining -= chunk.len();
                }
                None => break,
            }
        }

        total
    }

    fn settle(&self, chunk: &[LogRecord], outcomes: Vec<PersistOutcome>) {
        let mut outcomes = outcomes.into_iter();
        let mut persisted = 0;
        for record in chunk {
            match outcomes.next().unwrap_or(Err(SinkError::MissingOutcome)) {
                Ok(()) => persisted += 1,
                Err(e) => self.report_failure(record, &e),
            }
        }

        self.persisted.fetch_add(persisted, Ordering::Relaxed);
        if persisted < chunk.len() as u64 {
            warn!(
                "Total of {} log records failed to persist",
                chunk.len() as u64 - persisted
            );
        }
    }

    fn report_failure(&self, record: &LogRecord, error: &SinkError) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.console.emit(
            Severity::Error,
            "failed to persist log record",
            &json!({
                "record_id": record.id().to_string(),
                "category": record.category(),
                "severity": record.severity().as_str(),
                "error": error.to_string(),
            }),
        );
    }

    fn abandon(&self, count: usize, reason: &str) {
        if count == 0 {
            return;
        }
        self.dropped.fetch_add(count as u64, Ordering::Relaxed);
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
        self.console
            .emit(Severity::Warn, reason, &json!({ "count": count }));
    }
}

/// Records of a snapshot not yet settled by the sink.
///
/// Dropped early when the flush is abandoned, cancelled or unwinds; whatever is left is dropped.
struct Unsettled<'a> {
    shared: &'a Shared,
    remaining: usize,
}

impl Drop for Unsettled<'_> {
    fn drop(&mut self) {
        self.shared.abandon(self.remaining, "abandoned in-flight log records");
    }
}

/// Batches log records and ships them to a [`RecordSink`].
///
/// Construct one per process with [`Aggregator::start`] and share it behind an `Arc`.
pub struct Aggregator {
    shared: Arc<Shared>,
    runtime: Handle,
    cancel_token: CancellationToken,
    timer_task: Mutex<Option<JoinHandle<()>>>,
}

impl Aggregator {
    /// Starts an aggregator with the default [`crate::console::TracingConsole`] fallback.
    pub fn start(
        config: &AggregatorConfig,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, AggregatorError> {
        Self::start_with_console(config, sink, Arc::new(crate::console::TracingConsole))
    }

    /// Starts an aggregator that reports sink failures to `console`.
    ///
    /// Must be called from within a tokio runtime; the flush timer and size-triggered flushes run
    /// on that runtime. Calling `start` twice creates two independent aggregators.
    pub fn start_with_console(
        config: &AggregatorConfig,
        sink: Arc<dyn RecordSink>,
        console: Arc<dyn Console>,
    ) -> Result<Self, AggregatorError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| AggregatorError::NoRuntime)?;

        let shared = Arc::new(Shared {
            buffer: Mutex::new(Vec::with_capacity(config.batch_size)),
            flush_permit: TokioMutex::new(()),
            flush_scheduled: AtomicBool::new(false),
            batch_size: config.batch_size,
            sink,
            console,
            state: AtomicU8::new(RUNNING),
            abandon_token: CancellationToken::new(),
            submitted: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        });

        let cancel_token = CancellationToken::new();
        let timer_task = runtime.spawn(run_flush_timer(
            Arc::clone(&shared),
            config.flush_interval,
            cancel_token.clone(),
        ));

        debug!(
            "Aggregator started with batch size {} and flush interval {:?}",
            config.batch_size, config.flush_interval
        );

        Ok(Self {
            shared,
            runtime,
            cancel_token,
            timer_task: Mutex::new(Some(timer_task)),
        })
    }

    /// Buffers `record` for the next flush.
    ///
    /// Never fails and never waits on the sink; callable from runtime tasks and plain threads.
    /// Records submitted after shutdown has begun are discarded.
    pub fn submit(&self, record: LogRecord) {
        let buffered = {
            let mut buffer = self.shared.buffer();
            // Checked under the buffer lock so no append can land after the final snapshot.
            if self.shared.state.load(Ordering::Acquire) != RUNNING {
                trace!("Discarding log record {} submitted after shutdown", record.id());
                return;
            }
            buffer.push(record);
            buffer.len()
        };
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);

        if buffered >= self.shared.batch_size
            && self
                .shared
                .flush_scheduled
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            trace!("Buffer reached {buffered} records, scheduling flush");
            let shared = Arc::clone(&self.shared);
            self.runtime.spawn(async move {
                shared.flush(true).await;
            });
        }
    }

    /// Flushes the buffer now and waits for the sink. Returns the number of records forwarded.
    ///
    /// An empty buffer makes no sink call.
    pub async fn flush_now(&self) -> usize {
        self.shared.flush(false).await
    }

    /// Stops the timer, flushes what is left and waits up to `timeout` for it.
    ///
    /// Submissions are refused from the moment this is called. On timeout the final flush is
    /// abandoned and `ShutdownTimeout` reports how many records were dropped. Calling it a second
    /// time returns `NotRunning`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), AggregatorError> {
        let stopping = {
            let _buffer = self.shared.buffer();
            self.shared
                .state
                .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        };
        if !stopping {
            return Err(AggregatorError::NotRunning);
        }

        debug!("Aggregator shutting down");
        self.cancel_token.cancel();
        let timer_task = self
            .timer_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let abandoned_before = self.shared.abandoned.load(Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        // Spawned so that a timeout detaches the final flush instead of dropping it mid-chunk.
        let mut drain = self.runtime.spawn(async move {
            if let Some(task) = timer_task {
                if let Err(e) = task.await {
                    warn!("Flush timer ended abnormally: {e}");
                }
            }
            shared.flush(false).await
        });

        let result = match tokio::time::timeout(timeout, &mut drain).await {
            Ok(Ok(flushed)) => {
                debug!("Final flush forwarded {flushed} log records");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Final flush ended abnormally: {e}");
                let abandoned = self.shared.abandoned.load(Ordering::Relaxed) - abandoned_before;
                match usize::try_from(abandoned).unwrap_or(usize::MAX) {
                    0 => Ok(()),
                    abandoned => Err(AggregatorError::FinalFlushAborted { abandoned }),
                }
            }
            Err(_) => {
                self.shared.abandon_token.cancel();
                if let Err(e) = drain.await {
                    warn!("Final flush ended abnormally: {e}");
                }
                let leftover = std::mem::take(&mut *self.shared.buffer()).len();
                self.shared
                    .abandon(leftover, "dropped buffered log records on shutdown");

                let abandoned = self.shared.abandoned.load(Ordering::Relaxed) - abandoned_before;
                let abandoned = usize::try_from(abandoned).unwrap_or(usize::MAX);
                self.shared.console.emit(
                    Severity::Warn,
                    "shutdown timed out before the final flush completed",
                    &json!({
                        "abandoned": abandoned,
                        "timeout_ms": u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }),
                );
                Err(AggregatorError::ShutdownTimeout { abandoned })
            }
        };

        self.shared.state.store(STOPPED, Ordering::Release);
        debug!("Aggregator stopped");
        result
    }

    #[must_use]
    pub fn state(&self) -> AggregatorState {
        match self.shared.state.load(Ordering::Acquire) {
            RUNNING => AggregatorState::Running,
            STOPPING => AggregatorState::Stopping,
            _ => AggregatorState::Stopped,
        }
    }

    #[must_use]
    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            persisted: self.shared.persisted.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            flushes: self.shared.flushes.load(Ordering::Relaxed),
        }
    }

    /// Records currently waiting for a flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.shared.buffer().len()
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if self.shared.state.load(Ordering::Acquire) == RUNNING {
            let buffered = self.shared.buffer().len();
            if buffered > 0 {
                warn!("Aggregator dropped without shutdown, {buffered} buffered log records lost");
            }
        }
    }
}

async fn run_flush_timer(shared: Arc<Shared>, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // discard first tick, which is instantaneous

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!("Flush timer stopped");
                break;
            }
            _ = ticker.tick() => {
                // A sink panic must not take the timer down with it
                let flush = tokio::spawn({
                    let shared = Arc::clone(&shared);
                    async move { shared.flush(false).await }
                });
                match flush.await {
                    Ok(0) => {}
                    Ok(flushed) => trace!("Timer flush forwarded {flushed} log records"),
                    Err(e) => warn!("Timer flush ended abnormally: {e}"),
                }
            }
        }
    }
}
