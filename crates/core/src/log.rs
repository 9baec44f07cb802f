// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured log records and the sink seam.
//!
//! Producers (output capture, supervisor lifecycle events) publish records
//! through [`LogSink`]; the daemon's bus fans them out to WebSocket
//! subscribers and per-instance log files.

use crate::id::InstanceId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Where a record originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    System,
    Lifecycle,
    Stdout,
    Stderr,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::System => "system",
            LogSource::Lifecycle => "lifecycle",
            LogSource::Stdout => "stdout",
            LogSource::Stderr => "stderr",
        }
    }
}

/// One structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub source: LogSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, source: LogSource, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            source,
            instance_id: None,
            instance_name: None,
            message: message.into(),
        }
    }

    /// Attach the originating instance.
    pub fn for_instance(mut self, id: InstanceId, name: impl Into<String>) -> Self {
        self.instance_id = Some(id);
        self.instance_name = Some(name.into());
        self
    }

    /// Render as a single log-file line.
    ///
    /// Format: `2026-01-30T08:14:09Z [INFO] [stdout] message`
    pub fn render(&self) -> String {
        format!(
            "{} [{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.level.as_str(),
            self.source.as_str(),
            self.message
        )
    }
}

/// Seam between record producers and the daemon's log bus.
pub trait LogSink: Send + Sync {
    fn publish(&self, record: LogRecord);
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
