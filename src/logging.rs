//! JSONL request log.
//!
//! Every entry is appended to a file and kept in a bounded in-memory ring.
//! Entries written through a [`RequestLogger`] carry the id of the inbound
//! request so one proxied call can be followed end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const MAX_LOG_ENTRIES: usize = 10_000;
const REDACTED: &str = "[REDACTED]";

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
    pub request_id: Option<Uuid>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn for_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

struct Logger {
    entries: VecDeque<LogEntry>,
    writer: BufWriter<File>,
    secrets: Vec<String>,
}

impl Logger {
    fn open(file_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = VecDeque::with_capacity(MAX_LOG_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
                    if entries.len() >= MAX_LOG_ENTRIES {
                        entries.pop_front();
                    }
                    entries.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            entries,
            writer: BufWriter::new(file),
            secrets: Vec::new(),
        })
    }

    fn log(&mut self, mut entry: LogEntry) {
        for secret in &self.secrets {
            if entry.message.contains(secret.as_str()) {
                entry.message = entry.message.replace(secret.as_str(), REDACTED);
            }
        }

        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::open(file_path.as_ref())?))))
    }

    /// Scrub `secret` from every message logged from now on.
    pub fn redact(&self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        if let Ok(mut logger) = self.0.lock() {
            logger.secrets.push(secret);
        }
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    /// A handle that stamps every entry with `request_id`.
    #[must_use]
    pub fn for_request(&self, request_id: Uuid) -> RequestLogger {
        RequestLogger {
            inner: self.clone(),
            request_id,
        }
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0
            .lock()
            .map(|l| l.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct RequestLogger {
    inner: SharedLogger,
    request_id: Uuid,
}

impl RequestLogger {
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    fn log(&self, level: LogLevel, component: &str, message: String) {
        self.inner
            .log(LogEntry::new(level, component, message).for_request(self.request_id));
    }

    pub fn debug(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, component, message.into());
    }

    pub fn info(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message.into());
    }

    pub fn warn(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, component, message.into());
    }

    pub fn error(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, component, message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_entries_are_persisted_and_reloaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("proxy.log");

        let logger = SharedLogger::new(&path).unwrap();
        logger.info("startup", "first");
        logger.warn("startup", "second");
        drop(logger);

        let reopened = SharedLogger::new(&path).unwrap();
        let recent = reopened.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[0].level, LogLevel::Warn);
        assert_eq!(recent[1].message, "first");
    }

    #[test]
    fn test_request_logger_stamps_id() {
        let dir = tempdir().unwrap();
        let logger = SharedLogger::new(dir.path().join("proxy.log")).unwrap();
        let id = Uuid::new_v4();

        logger.for_request(id).error("proxy", "boom");
        logger.info("server", "unrelated");

        let recent = logger.recent(2);
        assert_eq!(recent[0].request_id, None);
        assert_eq!(recent[1].request_id, Some(id));
        assert_eq!(recent[1].level, LogLevel::Error);
    }

    #[test]
    fn test_redacted_secret_never_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proxy.log");
        let logger = SharedLogger::new(&path).unwrap();
        logger.redact("sk-secret-123");

        logger.error("proxy", "failed calling ?key=sk-secret-123");

        assert_eq!(logger.recent(1)[0].message, "failed calling ?key=[REDACTED]");
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("sk-secret-123"));
    }

    #[test]
    fn test_recent_respects_limit() {
        let dir = tempdir().unwrap();
        let logger = SharedLogger::new(dir.path().join("proxy.log")).unwrap();
        for i in 0..5 {
            logger.info("test", format!("entry {i}"));
        }
        let recent = logger.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "entry 4");
    }
}
