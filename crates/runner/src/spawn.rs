// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Editor child spawning.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// Everything needed to start one child: argv, environment additions, cwd.
#[derive(Debug, Clone)]
pub struct Launch {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

/// How a child left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Exited with status zero
    Normal,
    /// Exited with a nonzero status
    NonZero(i32),
    /// Terminated by a signal
    Signaled(i32),
}

impl ExitDisposition {
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitDisposition::Normal)
    }

    pub fn describe(&self) -> String {
        match self {
            ExitDisposition::Normal => "exited cleanly".to_string(),
            ExitDisposition::NonZero(code) => format!("exited with code {}", code),
            ExitDisposition::Signaled(signal) => format!("killed by signal {}", signal),
        }
    }
}

/// Errors from spawning a child.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("empty command line")]
    EmptyArgv,

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child exited before a pid could be observed")]
    NoPid,
}

/// A live child with its piped output streams.
///
/// The streams are `Option` so the caller can `take()` them for capture
/// tasks while the handle itself moves into the reaper's `wait()`.
#[derive(Debug)]
pub struct RunningChild {
    pub pid: u32,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
    child: Child,
}

impl RunningChild {
    /// Block until the child terminates and report its disposition.
    pub async fn wait(mut self) -> ExitDisposition {
        match self.child.wait().await {
            Ok(status) => {
                if status.success() {
                    ExitDisposition::Normal
                } else if let Some(code) = status.code() {
                    ExitDisposition::NonZero(code)
                } else {
                    ExitDisposition::Signaled(status.signal().unwrap_or(0))
                }
            }
            Err(e) => {
                tracing::warn!(pid = self.pid, error = %e, "wait on child failed");
                ExitDisposition::NonZero(-1)
            }
        }
    }
}

/// Start the process described by `launch` with piped stdout/stderr.
///
/// The child is detached from our lifetime: dropping the handle does not
/// kill it. Termination is always an explicit signal from the supervisor.
pub fn spawn(launch: &Launch) -> Result<RunningChild, SpawnError> {
    let (program, args) = launch.argv.split_first().ok_or(SpawnError::EmptyArgv)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&launch.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    for (key, value) in &launch.env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|source| SpawnError::Spawn { command: program.clone(), source })?;
    let pid = child.id().ok_or(SpawnError::NoPid)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tracing::debug!(pid, command = %launch.argv.join(" "), "spawned child");

    Ok(RunningChild { pid, stdout, stderr, child })
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
