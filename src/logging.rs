//! Structured request log.
//!
//! Entries are kept in a bounded in-memory ring, appended to a JSONL file when
//! one is configured, and mirrored to `tracing` so they also show up on the
//! console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

struct Logger {
    entries: VecDeque<LogEntry>,
    writer: Option<BufWriter<File>>,
}

impl Logger {
    fn open(file_path: Option<&Path>) -> std::io::Result<Self> {
        let writer = match file_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(BufWriter::new(file))
            }
            None => None,
        };

        Ok(Self {
            entries: VecDeque::with_capacity(256),
            writer,
        })
    }

    fn log(&mut self, entry: LogEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

/// Cheaply cloneable handle to the process-wide request log.
#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    /// Log to `file_path` (JSONL, appended) as well as memory and `tracing`.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let logger = Logger::open(Some(file_path.as_ref()))?;
        Ok(Self(Arc::new(Mutex::new(logger))))
    }

    /// Log to memory and `tracing` only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger {
            entries: VecDeque::with_capacity(256),
            writer: None,
        })))
    }

    pub fn log(&self, entry: LogEntry) {
        mirror_to_tracing(&entry);
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0
            .lock()
            .map(|l| l.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

fn mirror_to_tracing(entry: &LogEntry) {
    let component = entry.component.as_str();
    let request_id = entry.request_id.as_deref().unwrap_or("-");
    match entry.level {
        LogLevel::Debug => tracing::debug!(component, request_id, "{}", entry.message),
        LogLevel::Info => tracing::info!(component, request_id, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(component, request_id, "{}", entry.message),
        LogLevel::Error => tracing::error!(component, request_id, "{}", entry.message),
    }
}
