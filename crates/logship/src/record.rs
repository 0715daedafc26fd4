// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log records.
//!
//! A [`LogRecord`] is built once through [`LogRecordBuilder`] and never mutated afterwards: its
//! fields are only reachable through accessors. The serialized form of a record is the schema
//! handed to every [`crate::sink::RecordSink`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::DEFAULT_ORIGIN;
use crate::errors::ParseError;

/// Free-form structured metadata attached to a record.
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" | "critical" => Ok(Severity::Fatal),
            _ => Err(ParseError::UnknownSeverity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    id: Uuid,
    severity: Severity,
    category: String,
    message: String,
    metadata: Option<Metadata>,
    request_id: Option<String>,
    actor_id: Option<String>,
    origin: String,
    duration_ms: Option<u64>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl LogRecord {
    /// Starts a record. Category and message are not validated and may be empty.
    pub fn builder(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> LogRecordBuilder {
        LogRecordBuilder {
            severity,
            category: category.into(),
            message: message.into(),
            metadata: None,
            request_id: None,
            actor_id: None,
            origin: DEFAULT_ORIGIN.to_string(),
            duration_ms: None,
            error: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    #[must_use]
    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Logical time of the record, taken when it was built rather than when it is persisted.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Every field except the message, for console output.
    #[must_use]
    pub fn context(&self) -> Value {
        let mut context = serde_json::json!({
            "id": self.id.to_string(),
            "category": self.category,
            "origin": self.origin,
            "created_at": self.created_at.to_rfc3339(),
        });
        if let Value::Object(ref mut map) = context {
            if let Some(metadata) = &self.metadata {
                map.insert("metadata".to_string(), Value::Object(metadata.clone()));
            }
            if let Some(request_id) = &self.request_id {
                map.insert("request_id".to_string(), Value::from(request_id.as_str()));
            }
            if let Some(actor_id) = &self.actor_id {
                map.insert("actor_id".to_string(), Value::from(actor_id.as_str()));
            }
            if let Some(duration_ms) = self.duration_ms {
                map.insert("duration_ms".to_string(), Value::from(duration_ms));
            }
            if let Some(error) = &self.error {
                map.insert("error".to_string(), Value::from(error.as_str()));
            }
        }
        context
    }
}

#[derive(Debug, Clone)]
#[must_use]
pub struct LogRecordBuilder {
    severity: Severity,
    category: String,
    message: String,
    metadata: Option<Metadata>,
    request_id: Option<String>,
    actor_id: Option<String>,
    origin: String,
    duration_ms: Option<u64>,
    error: Option<String>,
}

impl LogRecordBuilder {
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replaces any metadata set so far.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Assigns the record id and creation timestamp.
    pub fn build(self) -> LogRecord {
        LogRecord {
            id: Uuid::new_v4(),
            severity: self.severity,
            category: self.category,
            message: self.message,
            metadata: self.metadata,
            request_id: self.request_id,
            actor_id: self.actor_id,
            origin: self.origin,
            duration_ms: self.duration_ms,
            error: self.error,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_identity() {
        let before = Utc::now();
        let first = LogRecord::builder(Severity::Info, "http", "request served").build();
        let second = LogRecord::builder(Severity::Info, "http", "request served").build();

        assert_ne!(first.id(), second.id());
        assert!(first.created_at() >= before);
        assert_eq!(first.origin(), DEFAULT_ORIGIN);
        assert!(first.metadata().is_none());
    }

    #[test]
    fn test_builder_optional_fields() {
        let record = LogRecord::builder(Severity::Error, "db", "query failed")
            .field("table", "users")
            .field("rows", 3)
            .request_id("req-1")
            .actor_id("user-9")
            .origin("billing")
            .duration_ms(42)
            .error("connection reset")
            .build();

        let metadata = record.metadata().expect("metadata should be set");
        assert_eq!(metadata.get("table"), Some(&Value::from("users")));
        assert_eq!(metadata.get("rows"), Some(&Value::from(3)));
        assert_eq!(record.request_id(), Some("req-1"));
        assert_eq!(record.actor_id(), Some("user-9"));
        assert_eq!(record.origin(), "billing");
        assert_eq!(record.duration_ms(), Some(42));
        assert_eq!(record.error(), Some("connection reset"));
    }

    #[test]
    fn test_empty_category_and_message_accepted() {
        let record = LogRecord::builder(Severity::Debug, "", "").build();
        assert_eq!(record.category(), "");
        assert_eq!(record.message(), "");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("INFO".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!(" fatal ".parse::<Severity>(), Ok(Severity::Fatal));
        assert_eq!(
            "loud".parse::<Severity>(),
            Err(ParseError::UnknownSeverity("loud".to_string()))
        );
        assert!(Severity::Debug < Severity::Fatal);
    }

    #[test]
    fn test_serialized_shape() {
        let record = LogRecord::builder(Severity::Warn, "cache", "miss")
            .field("key", "k1")
            .build();
        let json = serde_json::to_value(&record).expect("serialize");

        assert_eq!(json["severity"], "warn");
        assert_eq!(json["category"], "cache");
        assert_eq!(json["message"], "miss");
        assert_eq!(json["metadata"]["key"], "k1");
        assert_eq!(json["request_id"], Value::Null);
        assert_eq!(json["id"], record.id().to_string());

        let back: LogRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn test_context_excludes_message() {
        let record = LogRecord::builder(Severity::Info, "auth", "login")
            .actor_id("user-1")
            .build();
        let context = record.context();

        assert_eq!(context["category"], "auth");
        assert_eq!(context["actor_id"], "user-1");
        assert!(context.get("message").is_none());
        assert!(context.get("request_id").is_none());
    }
}
