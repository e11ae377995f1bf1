//! JSONL activity log: append-only line-delimited JSON for tooling consumption.
//!
//! Each line is a self-contained JSON object written with a single
//! `write_all`. A write failure moves the writer down the chain: primary file,
//! fallback file, stderr with an `[AHC-JSONL]` prefix, then silent discard.
//! Logging never fails a scan.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::AhcError;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Activity event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScanComplete,
    RulesLoaded,
    RuleDropped,
    ConfigChanged,
    ActionExecuted,
    ActionFailed,
    Error,
}

/// A single JSONL log entry; only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Asset path the event is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Check key (`unused`, `naming`, `redirector`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// AHC error code if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            check: None,
            asset_count: None,
            finding_count: None,
            rule_count: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.check = Some(check.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Record an error's code and message and mark the entry as failed.
    #[must_use]
    pub fn with_error(mut self, err: &AhcError) -> Self {
        self.ok = Some(false);
        self.error_code = Some(err.code().to_string());
        self.error_message = Some(err.to_string());
        self
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Tried when `path` cannot be opened or written.
    pub fallback_path: Option<PathBuf>,
    /// Size at which the current file is rotated. Default: 10 MiB.
    pub max_size_bytes: u64,
    /// Rotated generations kept next to the file. Default: 3.
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Defaults for a given primary path, falling back to the temp directory.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback_path: Some(std::env::temp_dir().join("ahc-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// An open log file and its current size.
struct LogFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl LogFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata().map_or(0, |meta| meta.len());
        Ok(Self { path, file, size })
    }

    /// `activity.jsonl` becomes `activity.jsonl.1`, older generations shift up.
    fn rotate(&mut self, keep: u32) -> io::Result<()> {
        if keep == 0 {
            fs::remove_file(&self.path)?;
        } else {
            for index in (1..keep).rev() {
                let _ = fs::rename(
                    rotated_name(&self.path, index),
                    rotated_name(&self.path, index + 1),
                );
            }
            fs::rename(&self.path, rotated_name(&self.path, 1))?;
        }
        *self = Self::open(self.path.clone())?;
        Ok(())
    }

    fn append(&mut self, line: &str, max_size: u64, keep: u32) -> io::Result<()> {
        if self.size > 0 && self.size + line.len() as u64 > max_size {
            self.rotate(keep)?;
        }
        self.file.write_all(line.as_bytes())?;
        self.size += line.len() as u64;
        Ok(())
    }
}

/// Where entries go right now.
enum Sink {
    File(LogFile),
    Stderr,
    Discard,
}

/// Append-only JSONL writer. Each entry is written straight through to the
/// file; on failure it moves down the chain and never comes back up.
pub struct JsonlWriter {
    sink: Sink,
    /// Files not tried yet, in order.
    pending: VecDeque<PathBuf>,
    max_size_bytes: u64,
    max_rotated_files: u32,
}

impl JsonlWriter {
    pub fn open(config: JsonlConfig) -> Self {
        let mut pending = VecDeque::from([config.path]);
        pending.extend(config.fallback_path);
        let mut writer = Self {
            sink: Sink::Discard,
            pending,
            max_size_bytes: config.max_size_bytes,
            max_rotated_files: config.max_rotated_files,
        };
        writer.degrade();
        writer
    }

    /// File currently written to; `None` once degraded to stderr or discard.
    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File(log) => Some(&log.path),
            Sink::Stderr | Sink::Discard => None,
        }
    }

    /// Write a single entry as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let mut line = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(err) => {
                notice(&format!("serialize error: {err}"));
                return;
            }
        };
        line.push('\n');

        loop {
            let failed = match &mut self.sink {
                Sink::File(log) => log
                    .append(&line, self.max_size_bytes, self.max_rotated_files)
                    .is_err(),
                Sink::Stderr => write!(io::stderr(), "[AHC-JSONL] {line}").is_err(),
                Sink::Discard => false,
            };
            if !failed {
                return;
            }
            self.degrade();
        }
    }

    /// Step to the next sink: a pending file, then stderr, then discard.
    fn degrade(&mut self) {
        if matches!(self.sink, Sink::Stderr) {
            self.sink = Sink::Discard;
            return;
        }
        // Opening the primary at startup is the only quiet transition.
        let mut switched = !matches!(self.sink, Sink::Discard);
        while let Some(path) = self.pending.pop_front() {
            match LogFile::open(path.clone()) {
                Ok(log) => {
                    if switched {
                        notice(&format!("writing to {}", path.display()));
                    }
                    self.sink = Sink::File(log);
                    return;
                }
                Err(err) => {
                    notice(&format!("cannot use {}: {err}", path.display()));
                    switched = true;
                }
            }
        }
        notice("no usable log file, writing to stderr");
        self.sink = Sink::Stderr;
    }
}

// ──────────────────────── shared handle ────────────────────────

/// Cloneable handle components log through. A disabled handle drops entries.
#[derive(Clone, Default)]
pub struct ActivityLog {
    inner: Option<Arc<Mutex<JsonlWriter>>>,
}

impl ActivityLog {
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(JsonlWriter::open(config)))),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn log(&self, entry: &LogEntry) {
        if let Some(inner) = &self.inner {
            inner.lock().write_entry(entry);
        }
    }

    pub fn info(&self, event: EventType, build: impl FnOnce(LogEntry) -> LogEntry) {
        if self.is_enabled() {
            self.log(&build(LogEntry::new(event, Severity::Info)));
        }
    }

    pub fn warn(&self, event: EventType, build: impl FnOnce(LogEntry) -> LogEntry) {
        if self.is_enabled() {
            self.log(&build(LogEntry::new(event, Severity::Warning)));
        }
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

// ──────────────────────── helpers ────────────────────────

/// `foo.jsonl` → `foo.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn notice(message: &str) {
    let _ = writeln!(io::stderr(), "[AHC-JSONL] {message}");
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
