// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic healthz checking of running editors.
//!
//! A pid being alive is not enough, since a hung editor still has a pid. The
//! effective liveness signal is the child's own `/healthz` endpoint, so
//! the loop probes it on a fixed cadence and demotes unresponsive
//! instances to `stopped`.

use std::sync::Arc;
use std::time::Duration;

use wb_core::{Clock, LogLevel, LogRecord, LogSource};

use crate::error::SupervisorError;
use crate::supervisor::Supervisor;

/// Per-request healthz timeout.
const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Pool summary cadence, in health ticks (~5 min at the 30s default).
const SUMMARY_EVERY: u64 = 10;

/// HTTP client wrapper for editor healthz probes.
pub struct HealthChecker {
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new() -> Result<Self, SupervisorError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(CHECK_TIMEOUT)
            .build()
            .map_err(|e| SupervisorError::Internal(format!("building health client: {}", e)))?;
        Ok(Self { client })
    }

    /// One health round-trip against a child on `port`.
    ///
    /// Healthy iff `GET /healthz` answers `200 OK` with a JSON body whose
    /// `status` is `"alive"`. A wake-up `GET /` goes first and its outcome
    /// is ignored; it dislodges editors that stall on first contact.
    pub async fn check(&self, port: u16) -> bool {
        let base = format!("http://127.0.0.1:{}", port);
        let _ = self.client.get(format!("{}/", base)).send().await;

        match self.client.get(format!("{}/healthz", base)).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                match resp.json::<serde_json::Value>().await {
                    Ok(body) => body.get("status").and_then(|v| v.as_str()) == Some("alive"),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }
}

/// Run the global health loop until the daemon exits.
///
/// Errors are per-instance and never terminate the loop.
pub fn spawn_health_loop<C: Clock>(
    supervisor: Arc<Supervisor<C>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            tick += 1;
            health_tick(&supervisor).await;
            if tick % SUMMARY_EVERY == 0 {
                summary(&supervisor);
            }
        }
    })
}

async fn health_tick<C: Clock>(supervisor: &Supervisor<C>) {
    for instance in supervisor.store.list() {
        let Some(pid) = instance.pid.filter(|_| instance.is_running()) else {
            continue;
        };
        if supervisor.checker.check(instance.port).await {
            continue;
        }

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
                    &instance,
                    format!("healthz unresponsive on port {}, marking stopped", instance.port),
                );
                if let Err(e) = supervisor.store.snapshot() {
                    tracing::warn!(instance = %instance.id, error = %e, "snapshot after demotion failed");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(instance = %instance.id, error = %e, "instance vanished during health tick");
            }
        }
    }
}

/// Pool summary on an explicit tick counter, not wall-clock arithmetic.
fn summary<C: Clock>(supervisor: &Supervisor<C>) {
    let instances = supervisor.store.list();
    let running = instances.iter().filter(|i| i.is_running()).count();
    supervisor.sink.publish(LogRecord::new(
        LogLevel::Info,
        LogSource::System,
        format!("pool summary: {} running of {} instances", running, instances.len()),
    ));
    tracing::info!(
        total = instances.len(),
        running,
        stopped = instances.len() - running,
        "instance pool summary"
    );
}
