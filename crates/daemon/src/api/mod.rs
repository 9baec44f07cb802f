// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane HTTP API.
//!
//! A thin request layer: validate input, call the supervisor or store,
//! map error kinds to status codes. Every failure body is
//! `{error: <message>}`; successful lifecycle operations echo the updated
//! instance so clients reconcile without a follow-up read.

mod logs_ws;
mod servers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::SupervisorError;
use crate::instance_log::InstanceLogWriter;
use crate::logbus::LogBus;
use crate::supervisor::DaemonSupervisor;
use wb_store::InstanceStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<DaemonSupervisor>,
    pub store: Arc<InstanceStore>,
    pub bus: Arc<LogBus>,
    pub files: Arc<InstanceLogWriter>,
    pub config: Arc<Config>,
    /// Proxy-side HTTP client; redirects pass through untouched.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        supervisor: Arc<DaemonSupervisor>,
        store: Arc<InstanceStore>,
        bus: Arc<LogBus>,
        files: Arc<InstanceLogWriter>,
        config: Arc<Config>,
    ) -> Result<Self, SupervisorError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SupervisorError::Internal(format!("building proxy client: {}", e)))?;
        Ok(Self { supervisor, store, bus, files, config, http })
    }
}

/// Build the daemon router: control API plus the proxy fallback.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(servers::health))
        .route("/servers", get(servers::list_servers).post(servers::create_server))
        .route("/servers/create-with-workspace", post(servers::create_with_workspace))
        .route("/servers/create-metadata", post(servers::create_metadata))
        .route("/servers/refresh-all", post(servers::refresh_all))
        .route("/servers/{id}", delete(servers::delete_server))
        .route("/servers/{id}/install-extensions", post(servers::install_extensions))
        .route("/servers/{id}/clone-workspace", post(servers::clone_workspace))
        .route("/servers/{id}/start", post(servers::start_server))
        .route("/servers/{id}/stop", post(servers::stop_server))
        .route("/servers/{id}/restart", post(servers::restart_server))
        .route("/servers/{id}/health", get(servers::server_health))
        .route("/servers/{id}/logs", get(servers::server_logs))
        .route("/servers/{id}/refresh-status", post(servers::refresh_status))
        .route("/ws/logs", get(logs_ws::stream_all))
        .route("/ws/logs/{instance_id}", get(logs_ws::stream_instance))
        .fallback(crate::proxy::handle)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API error envelope.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        let status = match &e {
            SupervisorError::NotFound(_) => StatusCode::NOT_FOUND,
            SupervisorError::Conflict(_) => StatusCode::CONFLICT,
            SupervisorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SupervisorError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            SupervisorError::Exhausted { .. }
            | SupervisorError::SpawnFailed(_)
            | SupervisorError::SeedFailed(_)
            | SupervisorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: e.to_string() }
    }
}

impl From<wb_store::StoreError> for ApiError {
    fn from(e: wb_store::StoreError) -> Self {
        ApiError::from(SupervisorError::from(e))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
