//! JSON-lines file sink with daily and size-based rotation.
//!
//! Each event becomes one line:
//!
//! ```text
//! {"@timestamp":"2026-10-17T08:00:00.000Z","level":"debug","message":"Timing for …","context":{…}}
//! ```
//!
//! On the first write of a new UTC day, or once the file reaches
//! `max_file_size_bytes`, the current file is renamed with a suffix
//! (`request-logs.log.2026-10-16`, or a second-resolution stamp for size
//! rotation) and a fresh file is opened. At most `max_rotated_files` rotated
//! files are kept.

use crate::sink::{LogSink, SinkError, level_name};
use chrono::{NaiveDate, SecondsFormat, Utc};
use reqlog_core::config::FileSinkConfig;
use serde_json::{Value, json};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

// ── Sink ─────────────────────────────────────────────────────────────────────

pub struct FileSink {
    config: FileSinkConfig,
    inner: Mutex<FileState>,
}

struct FileState {
    writer: BufWriter<File>,
    current_date: NaiveDate,
    current_size: u64,
}

impl FileSink {
    /// Open (or create) the log file, creating parent directories as needed.
    pub fn new(config: FileSinkConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = open_append(&config.path)?;
        let current_size = file.metadata()?.len();

        info!(path = %config.path.display(), "Request log file opened");

        Ok(Self {
            config,
            inner: Mutex::new(FileState {
                writer: BufWriter::new(file),
                current_date: Utc::now().date_naive(),
                current_size,
            }),
        })
    }

    /// Append one line, rotating first when due.
    pub fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut state = self.inner.lock().map_err(|_| SinkError::Poisoned)?;

        let today = Utc::now().date_naive();
        let date_due = today != state.current_date;
        let size_due = self.config.max_file_size_bytes > 0
            && state.current_size >= self.config.max_file_size_bytes;

        if date_due || size_due {
            state.writer.flush()?;
            let suffix = if date_due {
                state.current_date.format("%Y-%m-%d").to_string()
            } else {
                Utc::now().format("%Y-%m-%d-%H%M%S").to_string()
            };
            self.rotate(&suffix);
            state.writer = BufWriter::new(open_append(&self.config.path)?);
            state.current_date = today;
            state.current_size = 0;
        }

        let bytes = line.as_bytes();
        state.writer.write_all(bytes)?;
        state.writer.write_all(b"\n")?;
        state.writer.flush()?;
        state.current_size += bytes.len() as u64 + 1;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        let mut state = self.inner.lock().map_err(|_| SinkError::Poisoned)?;
        state.writer.flush()?;
        Ok(())
    }

    fn rotate(&self, suffix: &str) {
        let base = &self.config.path;
        let rotated = rotated_file_path(base, suffix);
        if base.exists() {
            match fs::rename(base, &rotated) {
                Ok(()) => info!(from = %base.display(), to = %rotated.display(), "Rotated request log"),
                Err(e) => error!(
                    error = %e,
                    from = %base.display(),
                    to = %rotated.display(),
                    "Failed to rotate request log"
                ),
            }
        }
        if self.config.max_rotated_files > 0
            && let Err(e) = prune_rotated_files(base, self.config.max_rotated_files)
        {
            warn!(error = %e, "Failed to prune old request log files");
        }
    }
}

impl LogSink for FileSink {
    fn write(&self, level: tracing::Level, message: &str, context: &Value) -> Result<(), SinkError> {
        let line = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "level": level_name(level),
            "message": message,
            "context": context,
        });
        self.write_line(&serde_json::to_string(&line)?)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `request-logs.log` → `request-logs.log.2026-10-16`.
fn rotated_file_path(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Keep only the newest `keep` rotated files. Suffixes sort chronologically.
fn prune_rotated_files(base: &Path, keep: usize) -> io::Result<()> {
    let parent = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = format!("{}.", base.file_name().unwrap_or_default().to_string_lossy());

    let mut rotated: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            rotated.push(entry.path());
        }
    }
    rotated.sort();

    let excess = rotated.len().saturating_sub(keep);
    for path in rotated.iter().take(excess) {
        debug!(path = %path.display(), "Pruning old rotated request log");
        fs::remove_file(path)?;
    }
    Ok(())
}
