// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-PID liveness and resource probing.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// One resource sample for a child process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcSample {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

/// Per-PID liveness + CPU/RSS probe.
///
/// Holds a single `sysinfo::System` for the process lifetime: CPU usage is
/// a delta between refreshes, so the same `System` must see consecutive
/// samples for the numbers to be meaningful.
pub struct ProcProbe {
    system: Mutex<System>,
}

impl ProcProbe {
    pub fn new() -> Self {
        Self { system: Mutex::new(System::new()) }
    }

    /// Whether a process with this pid currently exists.
    pub fn is_alive(&self, pid: u32) -> bool {
        let mut system = self.system.lock();
        let pid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).is_some()
    }

    /// Sample CPU percent and resident memory for a pid, if it is alive.
    pub fn sample(&self, pid: u32) -> Option<ProcSample> {
        let mut system = self.system.lock();
        let pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        let process = system.process(pid)?;
        Some(ProcSample {
            cpu_percent: process.cpu_usage(),
            memory_mb: process.memory() as f64 / (1024.0 * 1024.0),
        })
    }
}

impl Default for ProcProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
