// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-second resource sampling and state refresh.
//!
//! Each tick does three things, in order: sample CPU/RSS/uptime for every
//! running child (an unprobeable pid demotes the instance), reload the
//! durable snapshot to pick up out-of-band edits (in-process samples are
//! preserved across the reload), and write the reconciled registry back.

use std::sync::Arc;
use std::time::Duration;

use wb_core::{Clock, LogLevel};

use crate::supervisor::Supervisor;

/// Run the global metrics + state-refresh loop until the daemon exits.
pub fn spawn_metrics_loop<C: Clock>(
    supervisor: Arc<Supervisor<C>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            metrics_tick(&supervisor);
        }
    })
}

pub(crate) fn metrics_tick<C: Clock>(supervisor: &Supervisor<C>) {
    sample_running(supervisor);

    // The filesystem is a second source of truth: out-of-band edits and
    // multi-writer quirks propagate through this reload.
    if let Err(e) = supervisor.store.reload() {
        tracing::warn!(error = %e, "snapshot reload failed, keeping in-memory state");
    } else {
        demote_dead_children(supervisor);
    }

    if let Err(e) = supervisor.store.snapshot() {
        tracing::warn!(error = %e, "metrics snapshot failed");
    }
}

/// Sample every running child; demote instances whose pid cannot be probed.
fn sample_running<C: Clock>(supervisor: &Supervisor<C>) {
    let now = supervisor.clock.now_utc();
    for instance in supervisor.store.list() {
        let Some(pid) = instance.pid.filter(|_| instance.is_running()) else {
            continue;
        };
        match supervisor.probe.sample(pid) {
            Some(sample) => {
                let uptime = instance
                    .start_time
                    .map(|t| (now - t).num_seconds().max(0) as u64)
                    .unwrap_or(0);
                let _ = supervisor.store.update(instance.id.as_str(), |i| {
                    if i.pid == Some(pid) {
                        i.record_sample(sample.cpu_percent, sample.memory_mb, uptime, now);
                    }
                });
            }
            None => {
                demote(supervisor, &instance, pid, "pid vanished");
            }
        }
    }
}

/// After a reload, the durable file may claim `running` for children that
/// died while we were not looking (or before a daemon restart). One pass
/// of pid probes converges those to `stopped`.
fn demote_dead_children<C: Clock>(supervisor: &Supervisor<C>) {
    for instance in supervisor.store.list() {
        let Some(pid) = instance.pid.filter(|_| instance.is_running()) else {
            continue;
        };
        if !supervisor.probe.is_alive(pid) {
            demote(supervisor, &instance, pid, "pid not alive after reload");
        }
    }
}

fn demote<C: Clock>(
    supervisor: &Supervisor<C>,
    instance: &wb_core::Instance,
    pid: u32,
    reason: &str,
) {
    let mut demoted = false;
    let result = supervisor.store.update(instance.id.as_str(), |i| {
        if i.pid == Some(pid) {
            demoted = true;
            i.mark_stopped();
        }
    });
    match result {
        Ok(_) if demoted => {
            supervisor.lifecycle(
                LogLevel::Warn,
                instance,
                format!("editor (pid {}) gone: {}", pid, reason),
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(instance = %instance.id, error = %e, "instance vanished during metrics tick");
        }
    }
}
