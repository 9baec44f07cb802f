// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse proxy: `/<prefix>/<port>/<rest>` → `127.0.0.1:<port>/<rest>`.
//!
//! Registered as the router's fallback so the proxy owns every path under
//! its prefix, trailing slashes and all. Resolution reads the store under
//! the shared lock; a `running` instance whose child just died resolves
//! fine and then fails at dial time, which surfaces as 502 (HTTP) or a
//! close frame (WS).

mod assets;
mod ws;

use std::net::IpAddr;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;

use crate::api::AppState;

/// Fallback handler carrying all proxy traffic.
pub async fn handle(State(state): State<AppState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    let Some((port_str, rest_path)) = split_target(&path, &state.config.proxy_prefix) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response();
    };

    let Ok(port) = port_str.parse::<u16>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid port: {}", port_str)})),
        )
            .into_response();
    };

    let running = state
        .store
        .get_by_port(port)
        .map(|instance| instance.is_running())
        .unwrap_or(false);
    if !running {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("No running server on port {}", port)})),
        )
            .into_response();
    }

    if let Some(response) = assets::intercept(&rest_path) {
        return response;
    }

    if is_websocket_upgrade(req.method(), req.headers()) {
        let headers = req.headers().clone();
        let (mut parts, _body) = req.into_parts();
        return match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => ws::proxy_ws(upgrade, &headers, port, rest_path, query),
            Err(rejection) => rejection.into_response(),
        };
    }

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    forward_http(&state.http, port, &rest_path, query.as_deref(), client_ip, req).await
}

/// Case-insensitive `Upgrade: websocket` + `Connection: upgrade` detection.
///
/// A non-GET request carrying these headers is not a handshake; it goes
/// down the HTTP path with its `Upgrade` header preserved.
fn is_websocket_upgrade(method: &Method, headers: &HeaderMap) -> bool {
    if method != Method::GET {
        return false;
    }
    let upgrade_is_ws = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let connection_upgrades = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("upgrade"));
    upgrade_is_ws && connection_upgrades
}

/// Split `/<prefix>/<port>[/<rest>]` into the port segment and the
/// backend path (`/` when the rest is empty).
pub(crate) fn split_target(path: &str, prefix: &str) -> Option<(String, String)> {
    let under = path.strip_prefix('/')?.strip_prefix(prefix)?;
    let under = under.strip_prefix('/')?;
    let (port, rest) = match under.split_once('/') {
        Some((port, rest)) => (port, format!("/{}", rest)),
        None => (under, "/".to_string()),
    };
    if port.is_empty() {
        return None;
    }
    Some((port.to_string(), rest))
}

/// Forward one plain-HTTP request to the child.
async fn forward_http(
    client: &reqwest::Client,
    port: u16,
    rest_path: &str,
    query: Option<&str>,
    client_ip: Option<IpAddr>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("reading request body: {}", e)})),
            )
                .into_response();
        }
    };

    let mut url = format!("http://127.0.0.1:{}{}", port, rest_path);
    if let Some(q) = query {
        url.push('?');
        url.push_str(q);
    }

    let headers = build_forward_headers(parts.headers, client_ip);

    match client.request(parts.method, &url).headers(headers).body(body_bytes).send().await {
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": format!("backend unavailable: {}", e)})),
        )
            .into_response(),
        Ok(backend) => {
            let status = backend.status();
            let mut headers = backend.headers().clone();
            headers.remove(header::TRANSFER_ENCODING);
            headers.remove(header::CONTENT_LENGTH);
            let bytes = backend.bytes().await.unwrap_or_default();

            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
    }
}

/// Outbound header synthesis.
///
/// - `X-Forwarded-For` appends the client IP,
/// - `X-Forwarded-Host` carries the original `Host`,
/// - `X-Forwarded-Proto` reflects inbound TLS signals,
/// - `Host` is dropped so the transport sets the backend authority,
/// - an inbound `Upgrade` is preserved with `Connection: upgrade` forced.
pub(crate) fn build_forward_headers(
    mut headers: HeaderMap,
    client_ip: Option<IpAddr>,
) -> HeaderMap {
    let original_host = headers.remove(header::HOST);
    let inbound_https = wants_https(&headers);
    headers.remove(header::CONTENT_LENGTH);

    let had_upgrade = headers.contains_key(header::UPGRADE);
    headers.remove(header::CONNECTION);
    if had_upgrade {
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    }

    if let Some(ip) = client_ip {
        let forwarded = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert("x-forwarded-for", value);
        }
    }
    if let Some(host) = original_host {
        headers.insert("x-forwarded-host", host);
    }
    headers.insert(
        "x-forwarded-proto",
        HeaderValue::from_static(if inbound_https { "https" } else { "http" }),
    );

    headers
}

fn wants_https(headers: &HeaderMap) -> bool {
    let header_is = |name: &str, expected: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case(expected))
    };
    header_is("x-forwarded-proto", "https") || header_is("x-forwarded-ssl", "on")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
