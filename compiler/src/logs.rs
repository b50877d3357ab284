//! Process-wide log broadcasting.
//!
//! Entries are echoed to stderr (stdout carries pipeline JSON) and sent to
//! every subscriber of the broadcast channel.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for grouped output
    #[serde(default)]
    pub indent: u8,
    /// Input file this entry reports the outcome of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    fn at(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            file: None,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::at(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::at(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::at(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::at(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    quiet: AtomicBool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            sender,
            quiet: AtomicBool::new(false),
        }
    }

    /// Stop echoing to stderr. Subscribers still receive entries.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    pub fn log(&self, entry: LogEntry) {
        if !self.quiet.load(Ordering::Relaxed) {
            let prefix = match entry.level {
                LogLevel::Info => "   ",
                LogLevel::Success => "   ✓",
                LogLevel::Warning => "   ⚠",
                LogLevel::Error => "   ✗",
            };
            let indent = "   ".repeat(entry.indent as usize);
            eprintln!("{}{} {}", indent, prefix, entry.message);
        }

        // no receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn set_quiet(quiet: bool) {
    LOG_BROADCASTER.set_quiet(quiet);
}

pub fn subscribe() -> broadcast::Receiver<LogEntry> {
    LOG_BROADCASTER.subscribe()
}

pub fn log_entry(entry: LogEntry) {
    LOG_BROADCASTER.log(entry);
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::info(msg).with_indent(indent));
}

pub fn log_success_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::success(msg).with_indent(indent));
}

pub fn log_error_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::error(msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.set_quiet(true);
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::warning("careful").with_indent(2));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "careful");
        assert_eq!(entry.indent, 2);
    }

    #[test]
    fn test_log_without_subscribers() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.set_quiet(true);
        broadcaster.log(LogEntry::info("nobody listens"));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let value = serde_json::to_value(LogEntry::success("done")).unwrap();
        assert_eq!(value["level"], "success");
        assert_eq!(value["indent"], 0);
        assert!(value["timestamp"].is_string());
        assert!(value.get("file").is_none());

        let value = serde_json::to_value(LogEntry::error("failed").with_file("a.json")).unwrap();
        assert_eq!(value["file"], "a.json");
    }
}
