// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server lifecycle handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use wb_core::Instance;

use crate::adapters::WorkspaceSeed;
use crate::api::{ApiError, AppState};
use crate::supervisor::{CreateRequest, InstanceHealth, RefreshAllOutcome, RefreshOutcome};

pub(crate) async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub(crate) async fn list_servers(State(state): State<AppState>) -> Json<Vec<Instance>> {
    Json(state.store.list())
}

/// Pull a required `name` out of a JSON body without letting extractor
/// rejections bypass the spec's 400-for-invalid contract.
fn required_name(body: &Value) -> Result<String, ApiError> {
    body.get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("name is required"))
}

fn extensions_field(body: &Value) -> Result<Vec<String>, ApiError> {
    match body.get("extensions") {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|_| ApiError::bad_request("extensions must be a list of strings")),
    }
}

pub(crate) async fn create_server(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Instance>), ApiError> {
    let request = CreateRequest {
        name: required_name(&body)?,
        extensions: extensions_field(&body)?,
        seed: None,
    };
    let instance = state.supervisor.create(request).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub(crate) async fn create_metadata(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Instance>), ApiError> {
    let request =
        CreateRequest { name: required_name(&body)?, extensions: Vec::new(), seed: None };
    let instance = state.supervisor.create(request).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// Accumulated multipart fields shared by the two workspace endpoints.
#[derive(Default)]
struct WorkspaceForm {
    name: Option<String>,
    extensions: Vec<String>,
    zip_file: Option<Vec<u8>>,
    github_url: Option<String>,
}

impl WorkspaceForm {
    /// Archive uploads win over repository references when both arrive.
    fn seed(self) -> Option<WorkspaceSeed> {
        if let Some(bytes) = self.zip_file {
            return Some(WorkspaceSeed::Archive(bytes));
        }
        self.github_url
            .filter(|url| !url.trim().is_empty())
            .map(WorkspaceSeed::Repository)
    }
}

async fn read_workspace_form(mut multipart: Multipart) -> Result<WorkspaceForm, ApiError> {
    let mut form = WorkspaceForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("reading multipart form: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("name") => {
                form.name = Some(text_field(field).await?);
            }
            Some("extensions") => {
                let raw = text_field(field).await?;
                if !raw.trim().is_empty() {
                    form.extensions = serde_json::from_str(&raw).map_err(|_| {
                        ApiError::bad_request("extensions must be a JSON list of strings")
                    })?;
                }
            }
            Some("zip_file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("reading zip_file: {}", e)))?;
                if !bytes.is_empty() {
                    form.zip_file = Some(bytes.to_vec());
                }
            }
            Some("github_url") => {
                form.github_url = Some(text_field(field).await?);
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("reading form field: {}", e)))
}

pub(crate) async fn create_with_workspace(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Instance>), ApiError> {
    let form = read_workspace_form(multipart).await?;
    let name = form
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("name is required"))?;
    let extensions = form.extensions.clone();
    let request = CreateRequest { name, extensions, seed: form.seed() };
    let instance = state.supervisor.create(request).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub(crate) async fn clone_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Instance>, ApiError> {
    let form = read_workspace_form(multipart).await?;
    let seed = form
        .seed()
        .ok_or_else(|| ApiError::bad_request("either zip_file or github_url is required"))?;
    let instance = state.supervisor.clone_workspace(&id, seed).await?;
    Ok(Json(instance))
}

pub(crate) async fn install_extensions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Instance>, ApiError> {
    let extensions = extensions_field(&body)?;
    let instance = state.supervisor.install_extensions(&id, extensions).await?;
    Ok(Json(instance))
}

pub(crate) async fn start_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Instance>, ApiError> {
    Ok(Json(state.supervisor.start(&id).await?))
}

pub(crate) async fn stop_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Instance>, ApiError> {
    Ok(Json(state.supervisor.stop(&id).await?))
}

pub(crate) async fn restart_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Instance>, ApiError> {
    Ok(Json(state.supervisor.restart(&id).await?))
}

pub(crate) async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.supervisor.delete(&id).await?;
    Ok(Json(json!({"message": "instance deleted"})))
}

pub(crate) async fn server_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InstanceHealth>, ApiError> {
    Ok(Json(state.supervisor.instance_health(&id).await?))
}

#[derive(Deserialize)]
pub(crate) struct LogsQuery {
    lines: Option<usize>,
}

pub(crate) async fn server_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    // 404 for unknown instances, even though their log dir would be empty
    let instance = state.store.get(&id)?;
    let lines = query.lines.unwrap_or(100);
    let logs = state.files.tail(instance.id.as_str(), lines);
    Ok(Json(json!({ "logs": logs })))
}

pub(crate) async fn refresh_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    Ok(Json(state.supervisor.refresh_instance(&id).await?))
}

pub(crate) async fn refresh_all(State(state): State<AppState>) -> Json<RefreshAllOutcome> {
    Json(state.supervisor.refresh_all().await)
}
