// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket half of the reverse proxy.
//!
//! Upgrades the inbound client connection, dials a plain-WS connection to
//! the child, and runs two copy loops until either side closes. The
//! backend dial synthesizes `Origin: http://localhost:<port>`; editors
//! CORS-reject an upstream proxy's real origin, so the client's own
//! `Origin` header must never be copied through.

use axum::extract::ws::{CloseFrame, Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::ClientRequestBuilder;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message as BackendMessage;
use tokio_tungstenite::WebSocketStream;

type BackendSink = SplitSink<WebSocketStream<TcpStream>, BackendMessage>;
type BackendStream = SplitStream<WebSocketStream<TcpStream>>;

/// Complete the client handshake and bridge to the backend.
pub(crate) fn proxy_ws(
    upgrade: WebSocketUpgrade,
    headers: &HeaderMap,
    port: u16,
    rest_path: String,
    query: Option<String>,
) -> Response {
    let protocols = client_protocols(headers);
    let cookie = header_string(headers, header::COOKIE);
    let user_agent = header_string(headers, header::USER_AGENT);

    let upgrade = if protocols.is_empty() {
        upgrade
    } else {
        upgrade.protocols(protocols.clone())
    };

    upgrade.on_upgrade(move |client| async move {
        bridge(client, port, rest_path, query, protocols, cookie, user_agent).await;
    })
}

async fn bridge(
    client: WebSocket,
    port: u16,
    rest_path: String,
    query: Option<String>,
    protocols: Vec<String>,
    cookie: Option<String>,
    user_agent: Option<String>,
) {
    let mut target = format!("ws://127.0.0.1:{}{}", port, rest_path);
    if let Some(q) = &query {
        target.push('?');
        target.push_str(q);
    }
    let uri: tokio_tungstenite::tungstenite::http::Uri = match target.parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(url = %target, error = %e, "bad backend ws target");
            close_client(client, "bad backend target").await;
            return;
        }
    };

    let mut request = ClientRequestBuilder::new(uri)
        .with_header("Origin", format!("http://localhost:{}", port));
    if let Some(cookie) = cookie {
        request = request.with_header("Cookie", cookie);
    }
    if let Some(user_agent) = user_agent {
        request = request.with_header("User-Agent", user_agent);
    }
    if !protocols.is_empty() {
        request = request.with_sub_protocol(protocols.join(", "));
    }

    let tcp = match TcpStream::connect(("127.0.0.1", port)).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(port, error = %e, "backend tcp dial failed");
            close_client(client, "backend unavailable").await;
            return;
        }
    };
    let (backend, _response) = match tokio_tungstenite::client_async(request, tcp).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(port, error = %e, "backend ws handshake failed");
            close_client(client, "backend unavailable").await;
            return;
        }
    };

    let (backend_tx, backend_rx) = backend.split();
    let (client_tx, client_rx) = client.split();

    // First error or close on either side tears down both.
    tokio::select! {
        _ = client_to_backend(client_rx, backend_tx) => {}
        _ = backend_to_client(backend_rx, client_tx) => {}
    }
}

async fn client_to_backend(mut rx: SplitStream<WebSocket>, mut tx: BackendSink) {
    while let Some(next) = rx.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "client read error");
                break;
            }
        };
        let forward = match message {
            ClientMessage::Text(text) => BackendMessage::text(text.to_string()),
            ClientMessage::Binary(data) => BackendMessage::binary(data),
            ClientMessage::Close(frame) => {
                log_close(frame.as_ref().map(|f| f.code), "client");
                let _ = tx.send(BackendMessage::Close(None)).await;
                break;
            }
            // Ping/Pong are transport-managed on both sides
            _ => continue,
        };
        if tx.send(forward).await.is_err() {
            break;
        }
    }
}

async fn backend_to_client(mut rx: BackendStream, mut tx: SplitSink<WebSocket, ClientMessage>) {
    while let Some(next) = rx.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "backend read error");
                break;
            }
        };
        let forward = match message {
            BackendMessage::Text(text) => ClientMessage::Text(text.as_str().into()),
            BackendMessage::Binary(data) => ClientMessage::Binary(data),
            BackendMessage::Close(frame) => {
                log_close(frame.as_ref().map(|f| u16::from(f.code)), "backend");
                let _ = tx.send(ClientMessage::Close(None)).await;
                break;
            }
            _ => continue,
        };
        if tx.send(forward).await.is_err() {
            break;
        }
    }
}

async fn close_client(mut client: WebSocket, reason: &str) {
    let _ = client
        .send(ClientMessage::Close(Some(CloseFrame {
            code: 1011,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Close handling: going-away and abnormal closes are routine browser
/// behavior; anything else is worth a WARN.
fn log_close(code: Option<u16>, side: &str) {
    match code {
        Some(code)
            if code == u16::from(CloseCode::Away) || code == u16::from(CloseCode::Abnormal) =>
        {
            tracing::debug!(side, code, "websocket closed");
        }
        Some(code) => tracing::warn!(side, code, "websocket closed"),
        None => tracing::debug!(side, "websocket closed without a code"),
    }
}

fn client_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
