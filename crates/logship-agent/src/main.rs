// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use logship::{
    record::Metadata,
    sinks::{FileSink, HttpSink, HttpSinkConfig},
    Aggregator, LogRecord, Logger, RecordSink, Severity, ShipperConfig, SinkTarget,
    TracingConsole,
};

const STDIN_CATEGORY: &str = "stdin";

/// A structured line read from standard input.
#[derive(Debug, Deserialize)]
struct IncomingLine {
    message: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    actor_id: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Turns one input line into a record, or `None` for blank lines.
///
/// Lines that are not a JSON object with a `message` field are shipped verbatim at info level.
fn parse_line(logger: &Logger, line: &str) -> Option<LogRecord> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    let incoming = match serde_json::from_str::<IncomingLine>(line) {
        Ok(incoming) => incoming,
        Err(_) => {
            return Some(
                logger
                    .record(Severity::Info, STDIN_CATEGORY, line)
                    .build(),
            )
        }
    };

    let severity = incoming
        .severity
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Severity::Info);
    let category = incoming
        .category
        .unwrap_or_else(|| STDIN_CATEGORY.to_string());

    let mut builder = logger.record(severity, category, incoming.message);
    if let Some(metadata) = incoming.metadata {
        builder = builder.metadata(metadata);
    }
    if let Some(request_id) = incoming.request_id {
        builder = builder.request_id(request_id);
    }
    if let Some(actor_id) = incoming.actor_id {
        builder = builder.actor_id(actor_id);
    }
    if let Some(duration_ms) = incoming.duration_ms {
        builder = builder.duration_ms(duration_ms);
    }
    if let Some(error) = incoming.error {
        builder = builder.error(error);
    }
    Some(builder.build())
}

async fn build_sink(target: &SinkTarget) -> Result<Option<Arc<dyn RecordSink>>, String> {
    match target {
        SinkTarget::Console => Ok(None),
        SinkTarget::File(path) => {
            let sink = FileSink::open(path.clone())
                .await
                .map_err(|e| e.to_string())?;
            Ok(Some(Arc::new(sink)))
        }
        SinkTarget::Http {
            url,
            timeout,
            compression_level,
            https_proxy,
        } => {
            let sink = HttpSink::new(HttpSinkConfig {
                url: url.clone(),
                timeout: *timeout,
                compression_level: *compression_level,
                https_proxy: https_proxy.clone(),
            })
            .map_err(|e| e.to_string())?;
            Ok(Some(Arc::new(sink)))
        }
    }
}

#[tokio::main]
pub async fn main() {
    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return;
        }
    };

    // HTTP client internals stay quiet whatever the level
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", config.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let sink = match build_sink(&config.sink).await {
        Ok(sink) => sink,
        Err(e) => {
            error!("Error creating sink: {e}");
            return;
        }
    };

    let (logger, aggregator) = match sink {
        Some(sink) => match Aggregator::start(&config.aggregator, sink) {
            Ok(aggregator) => {
                let aggregator = Arc::new(aggregator);
                (
                    Logger::buffered(Arc::clone(&aggregator), config.origin.as_str()),
                    Some(aggregator),
                )
            }
            Err(e) => {
                error!("Error starting aggregator: {e}");
                return;
            }
        },
        None => (
            Logger::console(Arc::new(TracingConsole), config.origin.as_str()),
            None,
        ),
    };

    info!(
        "Shipping standard input as origin {} to {:?}",
        config.origin, config.sink
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(record) = parse_line(&logger, &line) {
                        logger.emit(record);
                    }
                }
                Ok(None) => {
                    debug!("Standard input closed");
                    break;
                }
                Err(e) => {
                    error!("Error reading standard input: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    if let Some(aggregator) = aggregator {
        match aggregator.shutdown(config.aggregator.shutdown_timeout).await {
            Ok(()) => {
                let stats = aggregator.stats();
                info!(
                    "Shut down after shipping {} of {} records ({} dropped)",
                    stats.persisted, stats.submitted, stats.dropped
                );
            }
            Err(e) => warn!("{e}"),
        }
    }
}
