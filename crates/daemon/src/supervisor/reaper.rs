// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-child exit reaping.
//!
//! One reaper task per spawn: it blocks on the child's `wait()` and then
//! reconciles the store. The pid guard decides everything: if the store
//! no longer references this pid (an explicit Stop got there first, or a
//! restart already spawned a successor), the reaper is a logged no-op.

use std::sync::Arc;

use wb_core::{InstanceId, LogLevel, LogRecord, LogSink, LogSource};
use wb_runner::RunningChild;
use wb_store::InstanceStore;

pub(crate) fn spawn_reaper(
    store: Arc<InstanceStore>,
    sink: Arc<dyn LogSink>,
    id: InstanceId,
    name: String,
    pid: u32,
    child: RunningChild,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let disposition = child.wait().await;
        let clean = disposition.is_clean();

        let mut reaped = false;
        let result = store.update(id.as_str(), |instance| {
            if instance.pid == Some(pid) {
                reaped = true;
                if clean {
                    instance.mark_stopped();
                } else {
                    instance.mark_failed();
                }
            }
        });

        match result {
            Ok(_) if reaped => {
                let level = if clean { LogLevel::Info } else { LogLevel::Error };
                sink.publish(
                    LogRecord::new(
                        level,
                        LogSource::Lifecycle,
                        format!("editor {} (pid {})", disposition.describe(), pid),
                    )
                    .for_instance(id.clone(), name),
                );
                if let Err(e) = store.snapshot() {
                    tracing::warn!(instance = %id, error = %e, "snapshot after reap failed");
                }
            }
            Ok(_) => {
                sink.publish(
                    LogRecord::new(
                        LogLevel::Debug,
                        LogSource::Lifecycle,
                        format!("child {} exit observed after state already advanced", pid),
                    )
                    .for_instance(id, name),
                );
            }
            Err(e) => {
                tracing::debug!(instance = %id, pid, error = %e, "instance gone before reap");
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
