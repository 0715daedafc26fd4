// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`crate::RecordSink`] implementations.

pub mod file;
pub mod http;

pub use file::FileSink;
pub use http::{HttpSink, HttpSinkConfig};
