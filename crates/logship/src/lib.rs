// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-local log batching and shipping.
//!
//! Application code builds [`record::LogRecord`]s and hands them to a [`logger::Logger`], which
//! either writes them straight to a [`console::Console`] or submits them to a shared
//! [`aggregator::Aggregator`]. The aggregator buffers records and forwards them in bounded batches
//! to a [`sink::RecordSink`], on a fixed interval or as soon as the buffer fills.
//!
//! ```text
//!   producers ──submit──> ┌────────────┐ ──persist──> ┌────────────┐
//!                         │ Aggregator │              │ RecordSink │
//!   flush timer ─flush──> └─────┬──────┘              └────────────┘
//!                               │ failures
//!                               v
//!                         ┌────────────┐
//!                         │  Console   │
//!                         └────────────┘
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod aggregator;
pub mod config;
pub mod console;
pub mod constants;
pub mod errors;
pub mod logger;
pub mod record;
pub mod sink;
pub mod sinks;

pub use aggregator::{Aggregator, AggregatorState, AggregatorStats};
pub use config::{AggregatorConfig, ShipperConfig, SinkTarget};
pub use console::{Console, TracingConsole};
pub use errors::{AggregatorError, SinkError};
pub use logger::Logger;
pub use record::{LogRecord, LogRecordBuilder, Metadata, Severity};
pub use sink::{PersistOutcome, RecordSink};
