// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Loaded once at startup and passed as an immutable handle to the
//! supervisor, proxy, and API. No hidden singletons.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wb_core::InstanceId;
use wb_store::PortRange;

use crate::env;
use crate::error::ConfigError;

/// Immutable daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding `data/`, `workspace/`, and `logs/`
    pub root: PathBuf,
    /// Control API bind address
    pub listen_addr: SocketAddr,
    /// Port range instances are allocated from
    pub port_range: PortRange,
    /// The supervised editor binary
    pub editor_bin: String,
    /// Reverse-proxy path prefix (no slashes)
    pub proxy_prefix: String,
    /// Health loop cadence
    pub health_interval: Duration,
    /// Metrics loop cadence
    pub metrics_interval: Duration,
    /// Grace period between SIGTERM and SIGKILL on stop
    pub stop_grace: Duration,
    /// Pause between the stop and start halves of a restart
    pub restart_delay: Duration,
}

impl Config {
    /// Load configuration from the environment (`WB_*` variables).
    pub fn load() -> Result<Self, ConfigError> {
        let (start, end) = env::port_range();
        if start > end {
            return Err(ConfigError::BadPortRange { start, end });
        }
        Ok(Self {
            root: env::root_dir()?,
            listen_addr: env::listen_addr()?,
            port_range: PortRange::new(start, end),
            editor_bin: env::editor_bin(),
            proxy_prefix: env::proxy_prefix(),
            health_interval: env::health_interval(),
            metrics_interval: env::metrics_interval(),
            stop_grace: Duration::from_secs(10),
            restart_delay: Duration::from_millis(500),
        })
    }

    pub fn data_root(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.root.join("workspace")
    }

    pub fn logs_root(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// The durable state file: a JSON object mapping id → instance.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_root().join("instances.json")
    }

    pub fn workspace_path(&self, id: &InstanceId) -> PathBuf {
        self.workspace_root().join(id.as_str())
    }

    pub fn data_path(&self, id: &InstanceId) -> PathBuf {
        self.data_root().join(id.as_str())
    }

    pub fn instance_log_dir(&self, id: &InstanceId) -> PathBuf {
        self.logs_root().join(id.as_str())
    }

    /// Editor name used for the per-instance config directory under
    /// `data/<id>/`: the basename of the editor binary.
    pub fn editor_name(&self) -> &str {
        Path::new(&self.editor_bin)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.editor_bin)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
