// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Side channel for reporting records immediately and for reporting sink failures.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::constants::CONSOLE_TARGET;
use crate::record::Severity;

/// Immediate, unbuffered output.
///
/// The aggregator reports persistence failures here, so implementations must never submit to an
/// [`crate::Aggregator`] themselves.
pub trait Console: Send + Sync {
    fn emit(&self, severity: Severity, message: &str, context: &Value);
}

/// Writes through `tracing` on the `logship::console` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn emit(&self, severity: Severity, message: &str, context: &Value) {
        match severity {
            Severity::Debug => debug!(target: CONSOLE_TARGET, %context, "{message}"),
            Severity::Info => info!(target: CONSOLE_TARGET, %context, "{message}"),
            Severity::Warn => warn!(target: CONSOLE_TARGET, %context, "{message}"),
            Severity::Error | Severity::Fatal => {
                error!(target: CONSOLE_TARGET, severity = %severity, %context, "{message}")
            }
        }
    }
}
