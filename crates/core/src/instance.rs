// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The instance data model.
//!
//! An instance is a logical editor server: its directories, its assigned
//! port, and an intermittent child process. The optional child-scoped
//! fields (`pid`, `start_time`, samples) are coupled to `status` and must
//! only be mutated through the `mark_*` helpers so the coherence invariant
//! (`running ⇔ pid present ⇔ start_time present`) holds at every commit.

use crate::id::InstanceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Stopped,
    Running,
    Failed,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Running => "running",
            InstanceStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical editor server instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Human label; not unique, never used as a key
    pub name: String,
    /// Port in the configured range; unique across live instances
    pub port: u16,
    pub workspace_path: PathBuf,
    pub data_path: PathBuf,
    /// Extension identifiers most recently materialized, in order
    #[serde(default)]
    pub extensions: Vec<String>,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Frozen argv snapshot of the current child; advisory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Instance {
    /// A freshly created instance: stopped, no child, no samples.
    pub fn new(
        id: InstanceId,
        name: impl Into<String>,
        port: u16,
        workspace_path: PathBuf,
        data_path: PathBuf,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            port,
            workspace_path,
            data_path,
            extensions: Vec::new(),
            status: InstanceStatus::Stopped,
            pid: None,
            start_time: None,
            command: None,
            uptime_seconds: None,
            cpu_percent: None,
            memory_mb: None,
            last_update: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == InstanceStatus::Running
    }

    /// Transition to `running` with a freshly spawned child.
    pub fn mark_running(&mut self, pid: u32, start_time: DateTime<Utc>, command: Vec<String>) {
        self.status = InstanceStatus::Running;
        self.pid = Some(pid);
        self.start_time = Some(start_time);
        self.command = Some(command);
        self.clear_samples();
    }

    /// Transition to `stopped`, clearing every child-scoped field.
    pub fn mark_stopped(&mut self) {
        self.status = InstanceStatus::Stopped;
        self.clear_child();
    }

    /// Transition to `failed`, clearing every child-scoped field.
    pub fn mark_failed(&mut self) {
        self.status = InstanceStatus::Failed;
        self.clear_child();
    }

    /// Record the most recent resource sample. Only meaningful while running.
    pub fn record_sample(
        &mut self,
        cpu_percent: f32,
        memory_mb: f64,
        uptime_seconds: u64,
        at: DateTime<Utc>,
    ) {
        self.cpu_percent = Some(cpu_percent);
        self.memory_mb = Some(memory_mb);
        self.uptime_seconds = Some(uptime_seconds);
        self.last_update = Some(at);
    }

    /// Carry samples over from a pre-reload copy of the same running child.
    ///
    /// Samples are computed in-process and are not authoritative on disk, so
    /// a reload would otherwise erase them.
    pub fn adopt_samples_from(&mut self, prior: &Instance) {
        self.cpu_percent = prior.cpu_percent;
        self.memory_mb = prior.memory_mb;
        self.uptime_seconds = prior.uptime_seconds;
        self.last_update = prior.last_update;
    }

    fn clear_child(&mut self) {
        self.pid = None;
        self.start_time = None;
        self.clear_samples();
    }

    fn clear_samples(&mut self) {
        self.uptime_seconds = None;
        self.cpu_percent = None;
        self.memory_mb = None;
        self.last_update = None;
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
