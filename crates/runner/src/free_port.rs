// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort port pre-cleanup.
//!
//! Editors sometimes leave an orphan bound to their port after an unclean
//! daemon exit. Before re-spawning onto that port, kill whatever currently
//! holds it. This is strictly best-effort: if the holders cannot be
//! enumerated the spawn proceeds anyway and bind failure surfaces through
//! the child's own stderr.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Command;

/// Kill every process currently bound to `port`.
///
/// Uses `lsof -ti tcp:<port>` for the holder query. Never returns an
/// error; failures are logged and the caller proceeds with the spawn.
pub async fn free_port(port: u16) {
    let output = match Command::new("lsof")
        .args(["-ti", &format!("tcp:{}", port)])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(port, error = %e, "port holder enumeration unavailable");
            return;
        }
    };

    // lsof exits nonzero when nothing holds the port
    if !output.status.success() {
        return;
    }

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        let Ok(pid) = line.trim().parse::<i32>() else {
            continue;
        };
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => tracing::info!(port, pid, "killed process holding target port"),
            Err(e) => tracing::warn!(port, pid, error = %e, "failed to kill port holder"),
        }
    }
}
