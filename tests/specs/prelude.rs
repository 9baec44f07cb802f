// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the workspace specs.

pub use axum_test::TestServer;
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tempfile::{tempdir, TempDir};

pub use wb_core::{InstanceStatus, LogSink, SystemClock};
pub use wb_daemon::adapters::{CliMaterializer, CommandSeeder};
pub use wb_daemon::api::{router, AppState};
pub use wb_daemon::config::Config;
pub use wb_daemon::instance_log::InstanceLogWriter;
pub use wb_daemon::logbus::{DaemonLogSink, LogBus};
pub use wb_daemon::supervisor::Supervisor;
pub use wb_runner::ProcProbe;
pub use wb_store::{InstanceStore, PortRange};

/// An in-process daemon with its own temp root.
pub struct TestDaemon {
    pub state: AppState,
    pub dir: TempDir,
}

impl TestDaemon {
    /// Daemon whose editor is a stub shell script running `body`.
    pub fn with_editor_body(body: &str) -> Self {
        let dir = tempdir().unwrap();
        let editor_bin = stub_editor(dir.path(), body);
        Self::with_editor(dir, editor_bin)
    }

    /// Daemon with a deliberately missing editor binary.
    pub fn without_editor() -> Self {
        let dir = tempdir().unwrap();
        Self::with_editor(dir, "/nonexistent/editor-binary".to_string())
    }

    /// Daemon whose allocator is pinned to a single externally-chosen port.
    pub fn with_pinned_port(port: u16) -> Self {
        let dir = tempdir().unwrap();
        let config = test_config(
            dir.path(),
            "/nonexistent/editor-binary".to_string(),
            PortRange::new(port, port),
        );
        Self { state: build_app_state(config), dir }
    }

    fn with_editor(dir: TempDir, editor_bin: String) -> Self {
        let config = test_config(dir.path(), editor_bin, PortRange::new(8500, 8999));
        Self { state: build_app_state(config), dir }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(router(self.state.clone())).unwrap()
    }
}

pub fn test_config(root: &std::path::Path, editor_bin: String, range: PortRange) -> Arc<Config> {
    Arc::new(Config {
        root: root.to_path_buf(),
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        port_range: range,
        editor_bin,
        proxy_prefix: "proxy".to_string(),
        health_interval: Duration::from_secs(30),
        metrics_interval: Duration::from_millis(100),
        stop_grace: Duration::from_millis(200),
        restart_delay: Duration::from_millis(10),
    })
}

/// Assemble the full daemon state the way `wbd`'s main does.
pub fn build_app_state(config: Arc<Config>) -> AppState {
    let store = Arc::new(InstanceStore::new(config.snapshot_path(), config.port_range));
    let bus = Arc::new(LogBus::new());
    let files = Arc::new(InstanceLogWriter::new(config.logs_root()));
    let sink: Arc<dyn LogSink> = Arc::new(DaemonLogSink::new(bus.clone(), files.clone()));
    let supervisor = Arc::new(
        Supervisor::new(
            config.clone(),
            store.clone(),
            Arc::new(ProcProbe::new()),
            sink,
            Arc::new(CommandSeeder),
            Arc::new(CliMaterializer::new(config.editor_bin.clone())),
            SystemClock,
        )
        .unwrap(),
    );
    AppState::new(supervisor, store, bus, files, config).unwrap()
}

/// Write an executable stub editor that ignores its argv and runs `body`.
pub fn stub_editor(dir: &std::path::Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("stub-editor");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

pub async fn create_instance(server: &TestServer, name: &str) -> Value {
    let response = server.post("/servers").json(&json!({"name": name})).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Poll the store until `pred` holds for the instance, or panic.
pub async fn wait_for<F>(store: &InstanceStore, id: &str, pred: F) -> wb_core::Instance
where
    F: Fn(&wb_core::Instance) -> bool,
{
    for _ in 0..200 {
        let instance = store.get(id).unwrap();
        if pred(&instance) {
            return instance;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached for {}", id);
}

/// Whether a pid exists, via /proc (the specs run on Linux).
pub fn pid_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}
