// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wbd`, the workbench daemon binary.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use wb_core::{LogSink, SystemClock};
use wb_daemon::adapters::{CliMaterializer, CommandSeeder};
use wb_daemon::api::{self, AppState};
use wb_daemon::config::Config;
use wb_daemon::error::{ConfigError, SupervisorError};
use wb_daemon::instance_log::InstanceLogWriter;
use wb_daemon::logbus::{DaemonLogSink, LogBus};
use wb_daemon::supervisor::{health, metrics, DaemonSupervisor, Supervisor};
use wb_runner::ProcProbe;
use wb_store::InstanceStore;

#[derive(Debug, Error)]
enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] wb_store::StoreError),

    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::load()?);
    std::fs::create_dir_all(config.data_root())?;
    std::fs::create_dir_all(config.workspace_root())?;
    std::fs::create_dir_all(config.logs_root())?;

    let store = Arc::new(InstanceStore::new(config.snapshot_path(), config.port_range));
    store.reload()?;
    tracing::info!(
        instances = store.list().len(),
        snapshot = %config.snapshot_path().display(),
        "registry loaded"
    );

    let bus = Arc::new(LogBus::new());
    let files = Arc::new(InstanceLogWriter::new(config.logs_root()));
    let sink: Arc<dyn LogSink> = Arc::new(DaemonLogSink::new(bus.clone(), files.clone()));

    let supervisor: Arc<DaemonSupervisor> = Arc::new(Supervisor::new(
        config.clone(),
        store.clone(),
        Arc::new(ProcProbe::new()),
        sink,
        Arc::new(CommandSeeder),
        Arc::new(CliMaterializer::new(config.editor_bin.clone())),
        SystemClock,
    )?);

    health::spawn_health_loop(supervisor.clone(), config.health_interval);
    metrics::spawn_metrics_loop(supervisor.clone(), config.metrics_interval);

    let state = AppState::new(supervisor.clone(), store, bus, files, config.clone())?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, prefix = %config.proxy_prefix, "daemon listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(supervisor))
        .await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then terminate every child before exiting.
async fn shutdown_signal(supervisor: Arc<DaemonSupervisor>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown requested, terminating children");
    supervisor.shutdown();
}
