// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance log files with size-based rotation.
//!
//! Each instance gets `logs/<id>/server.log`. Each append opens, writes,
//! and closes the file; fine for line-rate editor output. Failures are
//! logged via tracing but never propagate; logging must not break the
//! supervisor.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use wb_core::LogRecord;

/// Rotate once the active file reaches this size.
const ROTATE_BYTES: u64 = 1024 * 1024;

/// Total files kept per instance: `server.log` plus `.1`..`.4`.
const MAX_FILES: u32 = 5;

/// Append-only writer for per-instance log files.
pub struct InstanceLogWriter {
    logs_root: PathBuf,
}

impl InstanceLogWriter {
    pub fn new(logs_root: PathBuf) -> Self {
        Self { logs_root }
    }

    /// Append a record to its instance's log file.
    ///
    /// Records without an instance id are ignored.
    pub fn append(&self, record: &LogRecord) {
        let Some(id) = &record.instance_id else {
            return;
        };
        if let Err(e) = self.write_line(id.as_str(), &record.render()) {
            tracing::warn!(instance = %id, error = %e, "failed to write instance log");
        }
    }

    /// Last `lines` lines of the active log file; empty if the file is missing.
    pub fn tail(&self, id: &str, lines: usize) -> Vec<String> {
        let path = self.log_path(id);
        let Ok(content) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].iter().map(|s| s.to_string()).collect()
    }

    fn log_path(&self, id: &str) -> PathBuf {
        self.logs_root.join(id).join("server.log")
    }

    fn write_line(&self, id: &str, line: &str) -> std::io::Result<()> {
        let path = self.log_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.rotate_if_needed(&path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn rotate_if_needed(&self, path: &std::path::Path) -> std::io::Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() >= ROTATE_BYTES => self.rotate(path),
            _ => Ok(()),
        }
    }

    /// Shift `server.log.N` up by one, dropping the oldest, then move the
    /// active file to `.1`.
    fn rotate(&self, path: &std::path::Path) -> std::io::Result<()> {
        let rotated = |n: u32| path.with_extension(format!("log.{}", n));

        let oldest = rotated(MAX_FILES - 1);
        if oldest.exists() {
            let _ = fs::remove_file(&oldest);
        }
        for n in (1..MAX_FILES - 1).rev() {
            let src = rotated(n);
            if src.exists() {
                let _ = fs::rename(&src, rotated(n + 1));
            }
        }
        fs::rename(path, rotated(1))
    }
}

#[cfg(test)]
#[path = "instance_log_tests.rs"]
mod tests;
