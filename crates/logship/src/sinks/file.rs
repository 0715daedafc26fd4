// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, error};

use crate::errors::SinkError;
use crate::record::LogRecord;
use crate::sink::{PersistOutcome, RecordSink};

/// Appends records to a file, one JSON object per line.
pub struct FileSink {
    path: PathBuf,
    file: TokioMutex<File>,
}

impl FileSink {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::Setup(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path,
            file: TokioMutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, payload: &[u8]) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(payload).await?;
        file.flush().await?;
        file.sync_data().await
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn persist(&self, batch: &[LogRecord]) -> Vec<PersistOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut payload = Vec::new();
        for record in batch {
            match serde_json::to_vec(record) {
                Ok(line) => {
                    payload.extend_from_slice(&line);
                    payload.push(b'\n');
                    outcomes.push(Ok(()));
                }
                Err(e) => outcomes.push(Err(SinkError::Serialize(e.to_string()))),
            }
        }

        if payload.is_empty() {
            return outcomes;
        }

        match self.write(&payload).await {
            Ok(()) => debug!("Wrote {} bytes to {}", payload.len(), self.path.display()),
            Err(e) => {
                error!("Failed to write log records to {}: {e}", self.path.display());
                let failure = SinkError::from(e);
                for outcome in outcomes.iter_mut().filter(|o| o.is_ok()) {
                    *outcome = Err(failure.clone());
                }
            }
        }

        outcomes
    }
}
