// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Buffer length at which a flush is triggered without waiting for the timer.
pub const DEFAULT_BATCH_SIZE: usize = 50;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on how long `shutdown` waits for the final flush.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Origin stamped on records when none is configured.
pub const DEFAULT_ORIGIN: &str = "logship";

/// Tracing target used by [`crate::console::TracingConsole`].
pub const CONSOLE_TARGET: &str = "logship::console";

pub const DEFAULT_LOG_LEVEL: &str = "info";
