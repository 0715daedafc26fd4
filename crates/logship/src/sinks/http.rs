// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, Proxy};
use serde_json::Value;
use tracing::{debug, error};

use crate::constants::DEFAULT_HTTP_TIMEOUT;
use crate::errors::SinkError;
use crate::record::LogRecord;
use crate::sink::{PersistOutcome, RecordSink};

#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Endpoint receiving a JSON array of records per request
    pub url: String,
    pub timeout: Duration,
    /// zstd level; bodies are sent uncompressed when unset
    pub compression_level: Option<i32>,
    pub https_proxy: Option<String>,
}

impl HttpSinkConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            compression_level: None,
            https_proxy: None,
        }
    }
}

/// Posts batches of records to an HTTP intake.
///
/// A batch succeeds or fails as a whole, except for records that cannot be serialized.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    url: String,
    compression_level: Option<i32>,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(proxy) = &config.https_proxy {
            let proxy = Proxy::https(proxy)
                .map_err(|e| SinkError::Setup(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| SinkError::Setup(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url,
            compression_level: config.compression_level,
        })
    }

    fn encode(&self, records: &[Value]) -> Result<Vec<u8>, SinkError> {
        let body = serde_json::to_vec(records).map_err(|e| SinkError::Payload(e.to_string()))?;
        match self.compression_level {
            Some(level) => zstd::encode_all(body.as_slice(), level)
                .map_err(|e| SinkError::Payload(format!("failed to compress payload: {e}"))),
            None => Ok(body),
        }
    }

    async fn ship(&self, body: Vec<u8>) -> PersistOutcome {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if self.compression_level.is_some() {
            request = request.header(CONTENT_ENCODING, "zstd");
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Destination {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        error!("{status}: Failed to push log records: {message:?}");
        Err(SinkError::Destination {
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut records = Vec::with_capacity(batch.len());
        for record in batch {
            match serde_json::to_value(record) {
                Ok(value) => {
                    records.push(value);
                    outcomes.push(Ok(()));
                }
                Err(e) => outcomes.push(Err(SinkError::Serialize(e.to_string()))),
            }
        }

        if records.is_empty() {
            return outcomes;
        }

        let shipped = match self.encode(&records) {
            Ok(body) => {
                debug!("Shipping {} log records ({} bytes)", records.len(), body.len());
                self.ship(body).await
            }
            Err(e) => Err(e),
        };

        if shipped.is_err() {
            for outcome in outcomes.iter_mut().filter(|o| o.is_ok()) {
                *outcome = shipped.clone();
            }
        }

        outcomes
    }
}
