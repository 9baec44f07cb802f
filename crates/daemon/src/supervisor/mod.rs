// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance lifecycle supervision.
//!
//! The supervisor owns every mutation of an instance's lifecycle state.
//! Operations sequence the store update and the external side effect
//! (spawn/kill/filesystem) so that the store reflects reality when the
//! operation returns, and every mutation is followed by a durable
//! snapshot. I/O never happens while the store's exclusive lock is held;
//! the pattern is read → release → side effect → commit.

mod argv;
pub mod health;
pub mod metrics;
mod reaper;

use std::fs;
use std::sync::Arc;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use wb_core::{
    Clock, Instance, InstanceId, InstanceStatus, LogLevel, LogRecord, LogSink, LogSource,
    SystemClock,
};
use wb_runner::{free_port, spawn, ProcProbe};
use wb_store::InstanceStore;

use crate::adapters::{ExtensionMaterializer, ExtensionOutcome, WorkspaceSeed, WorkspaceSeeder};
use crate::config::Config;
use crate::error::SupervisorError;
use health::HealthChecker;

/// The daemon's concrete supervisor type.
pub type DaemonSupervisor = Supervisor<SystemClock>;

/// Inputs for creating an instance.
pub struct CreateRequest {
    pub name: String,
    pub extensions: Vec<String>,
    pub seed: Option<WorkspaceSeed>,
}

/// Point-in-time health report for one instance.
#[derive(Debug, Serialize)]
pub struct InstanceHealth {
    pub status: InstanceStatus,
    pub http_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

/// Diagnostic result of a forced status refresh.
#[derive(Debug, Serialize)]
pub struct RefreshOutcome {
    pub old_status: InstanceStatus,
    pub new_status: InstanceStatus,
    /// "alive", "dead", or "none"
    pub pid_status: String,
    /// "alive", "unhealthy", or "skipped"
    pub healthz_status: String,
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshedServer {
    pub id: InstanceId,
    pub name: String,
    pub old_status: InstanceStatus,
    pub new_status: InstanceStatus,
}

#[derive(Debug, Serialize)]
pub struct RefreshAllOutcome {
    pub total_servers: usize,
    pub updated: usize,
    pub servers: Vec<RefreshedServer>,
}

/// Owns lifecycle transitions and coordinates runner, store, and adapters.
pub struct Supervisor<C: Clock = SystemClock> {
    pub(crate) config: Arc<Config>,
    pub(crate) store: Arc<InstanceStore>,
    pub(crate) probe: Arc<ProcProbe>,
    pub(crate) sink: Arc<dyn LogSink>,
    pub(crate) seeder: Arc<dyn WorkspaceSeeder>,
    pub(crate) materializer: Arc<dyn ExtensionMaterializer>,
    pub(crate) checker: HealthChecker,
    pub(crate) clock: C,
}

impl<C: Clock> Supervisor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        store: Arc<InstanceStore>,
        probe: Arc<ProcProbe>,
        sink: Arc<dyn LogSink>,
        seeder: Arc<dyn WorkspaceSeeder>,
        materializer: Arc<dyn ExtensionMaterializer>,
        clock: C,
    ) -> Result<Self, SupervisorError> {
        let checker = HealthChecker::new()?;
        Ok(Self { config, store, probe, sink, seeder, materializer, checker, clock })
    }

    // --- lifecycle operations -------------------------------------------

    /// Create a new instance: allocate a port, lay out its directories,
    /// seed the workspace if asked, insert as `stopped`, materialize
    /// extensions (non-fatal), snapshot.
    pub async fn create(&self, req: CreateRequest) -> Result<Instance, SupervisorError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(SupervisorError::InvalidInput("name is required".to_string()));
        }

        let id = InstanceId::generate();
        let port = self.store.allocate_port(&id)?;
        let workspace_path = self.config.workspace_path(&id);
        let data_path = self.config.data_path(&id);

        let made_dirs =
            fs::create_dir_all(&workspace_path).and_then(|_| fs::create_dir_all(&data_path));
        if let Err(e) = made_dirs {
            self.store.release_port(port);
            return Err(SupervisorError::Internal(format!(
                "creating instance directories: {}",
                e
            )));
        }

        if let Some(seed) = &req.seed {
            if let Err(e) = self.seeder.seed(&workspace_path, seed).await {
                // Seed failure is fatal: roll back directories and the reservation
                let _ = fs::remove_dir_all(&workspace_path);
                let _ = fs::remove_dir_all(&data_path);
                self.store.release_port(port);
                return Err(SupervisorError::SeedFailed(e.to_string()));
            }
        }

        let instance = Instance::new(id.clone(), name, port, workspace_path, data_path);
        self.store.insert(instance.clone())?;
        self.lifecycle(LogLevel::Info, &instance, format!("instance created on port {}", port));

        let instance = if req.extensions.is_empty() {
            instance
        } else {
            let outcomes =
                self.materializer.materialize(&instance.data_path, &req.extensions).await;
            self.log_extension_outcomes(&instance, &outcomes);
            self.store.update(id.as_str(), |i| i.extensions = req.extensions.clone())?
        };

        self.store.snapshot()?;
        Ok(instance)
    }

    /// Start the instance's editor child.
    ///
    /// Precondition: not running. On success the store already shows
    /// `running` with the child's pid, and the reaper is armed.
    pub async fn start(&self, id: &str) -> Result<Instance, SupervisorError> {
        let instance = self.store.get(id)?;
        if instance.is_running() {
            return Err(SupervisorError::Conflict(format!(
                "instance {} is already running",
                instance.id
            )));
        }

        let editor_dir = instance.data_path.join(self.config.editor_name());
        fs::create_dir_all(&editor_dir)
            .map_err(|e| SupervisorError::Internal(format!("creating editor config dir: {}", e)))?;

        // Best-effort: dislodge whatever is squatting on the target port
        free_port(instance.port).await;

        let launch = argv::build_launch(&self.config, &instance);
        let mut child = match spawn(&launch) {
            Ok(child) => child,
            Err(e) => {
                self.lifecycle(LogLevel::Error, &instance, format!("spawn failed: {}", e));
                return Err(SupervisorError::SpawnFailed(e.to_string()));
            }
        };

        let pid = child.pid;
        let start_time = self.clock.now_utc();
        let updated = self
            .store
            .update(id, |i| i.mark_running(pid, start_time, launch.argv.clone()))?;
        self.store.snapshot()?;
        self.lifecycle(
            LogLevel::Info,
            &updated,
            format!("editor started (pid {}) on port {}", pid, updated.port),
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(wb_runner::capture_stream(
                stdout,
                LogSource::Stdout,
                updated.id.clone(),
                updated.name.clone(),
                self.sink.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(wb_runner::capture_stream(
                stderr,
                LogSource::Stderr,
                updated.id.clone(),
                updated.name.clone(),
                self.sink.clone(),
            ));
        }

        reaper::spawn_reaper(
            self.store.clone(),
            self.sink.clone(),
            updated.id.clone(),
            updated.name.clone(),
            pid,
            child,
        );

        Ok(updated)
    }

    /// Stop the instance's child gracefully.
    ///
    /// SIGTERM now, SIGKILL after the grace period if the pid survives.
    /// The status flips to `stopped` immediately: the signal plus the
    /// reaper converge the real state, and health/metrics skip the
    /// instance once its pid is cleared.
    pub async fn stop(&self, id: &str) -> Result<Instance, SupervisorError> {
        let instance = self.store.get(id)?;
        let Some(pid) = instance.pid.filter(|_| instance.is_running()) else {
            return Err(SupervisorError::Conflict(format!(
                "instance {} is not running",
                instance.id
            )));
        };

        if let Err(e) = send_signal(pid, Signal::SIGTERM) {
            tracing::warn!(instance = %instance.id, pid, error = %e, "SIGTERM failed");
        }

        let probe = self.probe.clone();
        let grace = self.config.stop_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if probe.is_alive(pid) {
                tracing::warn!(pid, "grace period expired, force-killing");
                let _ = send_signal(pid, Signal::SIGKILL);
            }
        });

        let updated = self.store.update(id, |i| i.mark_stopped())?;
        self.store.snapshot()?;
        self.lifecycle(LogLevel::Info, &updated, format!("editor stopping (was pid {})", pid));
        Ok(updated)
    }

    /// Stop (if running), pause briefly, start.
    pub async fn restart(&self, id: &str) -> Result<Instance, SupervisorError> {
        let instance = self.store.get(id)?;
        if instance.is_running() {
            self.stop(id).await?;
            tokio::time::sleep(self.config.restart_delay).await;
        }
        self.start(id).await
    }

    /// Delete the instance and all of its on-disk state.
    pub async fn delete(&self, id: &str) -> Result<(), SupervisorError> {
        let instance = self.store.get(id)?;
        if let Some(pid) = instance.pid {
            let _ = send_signal(pid, Signal::SIGKILL);
        }

        for dir in [
            &instance.data_path,
            &instance.workspace_path,
            &self.config.instance_log_dir(&instance.id),
        ] {
            if let Err(e) = fs::remove_dir_all(dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        instance = %instance.id,
                        dir = %dir.display(),
                        error = %e,
                        "failed to remove instance directory"
                    );
                }
            }
        }

        self.store.remove(id)?;
        self.store.snapshot()?;
        self.sink.publish(LogRecord::new(
            LogLevel::Info,
            LogSource::Lifecycle,
            format!("instance {} ({}) deleted", instance.id, instance.name),
        ));
        Ok(())
    }

    /// Materialize extensions into an existing instance.
    ///
    /// Individual failures are logged and non-fatal; the instance records
    /// the most recently materialized list.
    pub async fn install_extensions(
        &self,
        id: &str,
        extensions: Vec<String>,
    ) -> Result<Instance, SupervisorError> {
        let instance = self.store.get(id)?;
        let outcomes = self.materializer.materialize(&instance.data_path, &extensions).await;
        self.log_extension_outcomes(&instance, &outcomes);
        let updated = self.store.update(id, |i| i.extensions = extensions.clone())?;
        self.store.snapshot()?;
        Ok(updated)
    }

    /// Seed an existing instance's workspace from an archive or repository.
    pub async fn clone_workspace(
        &self,
        id: &str,
        seed: WorkspaceSeed,
    ) -> Result<Instance, SupervisorError> {
        let instance = self.store.get(id)?;
        self.seeder
            .seed(&instance.workspace_path, &seed)
            .await
            .map_err(|e| SupervisorError::SeedFailed(e.to_string()))?;
        self.lifecycle(LogLevel::Info, &instance, "workspace seeded");
        Ok(instance)
    }

    // --- diagnostics ----------------------------------------------------

    /// Health report combining stored samples with a live healthz round-trip.
    pub async fn instance_health(&self, id: &str) -> Result<InstanceHealth, SupervisorError> {
        let instance = self.store.get(id)?;
        let http_healthy = match instance.pid {
            Some(_) if instance.is_running() => self.checker.check(instance.port).await,
            _ => false,
        };
        Ok(InstanceHealth {
            status: instance.status,
            http_healthy,
            cpu_percent: instance.cpu_percent,
            memory_mb: instance.memory_mb,
            uptime_seconds: instance.uptime_seconds,
        })
    }

    /// Re-derive one instance's status from the world: pid first, then healthz.
    pub async fn refresh_instance(&self, id: &str) -> Result<RefreshOutcome, SupervisorError> {
        let instance = self.store.get(id)?;
        let old_status = instance.status;

        let (pid_status, healthz_status, should_stop) = match instance.pid {
            None => ("none", "skipped", false),
            Some(pid) if !self.probe.is_alive(pid) => ("dead", "skipped", true),
            Some(_) => {
                if self.checker.check(instance.port).await {
                    ("alive", "alive", false)
                } else {
                    ("alive", "unhealthy", true)
                }
            }
        };

        let updated = should_stop && instance.is_running();
        let new_status = if updated {
            let pid = instance.pid;
            let refreshed = self.store.update(id, |i| {
                if i.pid == pid {
                    i.mark_stopped();
                }
            })?;
            self.store.snapshot()?;
            self.lifecycle(
                LogLevel::Warn,
                &instance,
                format!("status refresh: {} → {}", old_status, refreshed.status),
            );
            refreshed.status
        } else {
            old_status
        };

        Ok(RefreshOutcome {
            old_status,
            new_status,
            pid_status: pid_status.to_string(),
            healthz_status: healthz_status.to_string(),
            updated,
        })
    }

    /// Refresh every instance; never fails, per-instance errors are logged.
    pub async fn refresh_all(&self) -> RefreshAllOutcome {
        let instances = self.store.list();
        let total_servers = instances.len();
        let mut servers = Vec::with_capacity(total_servers);
        let mut updated = 0;

        for instance in instances {
            match self.refresh_instance(instance.id.as_str()).await {
                Ok(outcome) => {
                    if outcome.updated {
                        updated += 1;
                    }
                    servers.push(RefreshedServer {
                        id: instance.id,
                        name: instance.name,
                        old_status: outcome.old_status,
                        new_status: outcome.new_status,
                    });
                }
                Err(e) => {
                    tracing::warn!(instance = %instance.id, error = %e, "refresh failed");
                }
            }
        }

        RefreshAllOutcome { total_servers, updated, servers }
    }

    // --- shutdown -------------------------------------------------------

    /// Process-wide shutdown: signal every known child, final snapshot.
    ///
    /// No drain of proxy connections is attempted.
    pub fn shutdown(&self) {
        for instance in self.store.list() {
            if let Some(pid) = instance.pid {
                tracing::info!(instance = %instance.id, pid, "terminating child on shutdown");
                let _ = send_signal(pid, Signal::SIGTERM);
            }
        }
        if let Err(e) = self.store.snapshot() {
            tracing::warn!(error = %e, "final snapshot failed");
        }
    }

    // --- helpers --------------------------------------------------------

    pub(crate) fn lifecycle(
        &self,
        level: LogLevel,
        instance: &Instance,
        message: impl Into<String>,
    ) {
        self.sink.publish(
            LogRecord::new(level, LogSource::Lifecycle, message)
                .for_instance(instance.id.clone(), instance.name.clone()),
        );
    }

    fn log_extension_outcomes(&self, instance: &Instance, outcomes: &[ExtensionOutcome]) {
        for outcome in outcomes {
            match &outcome.result {
                Ok(()) => self.lifecycle(
                    LogLevel::Info,
                    instance,
                    format!("extension {} installed", outcome.extension),
                ),
                Err(reason) => self.lifecycle(
                    LogLevel::Warn,
                    instance,
                    format!("extension {} failed: {}", outcome.extension, reason),
                ),
            }
        }
    }
}

pub(crate) fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::errno::Errno> {
    kill(Pid::from_raw(pid as i32), signal)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
