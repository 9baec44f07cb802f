// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse proxy specs: resolution failures, HTTP pass-through, and the
//! WebSocket handshake with verbatim frame copying.

use crate::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn unparsable_port_is_bad_request() {
    let daemon = TestDaemon::without_editor();
    let server = daemon.server();
    let response = server.get("/proxy/notanumber/").await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_backend_is_not_found_with_explanation() {
    let daemon = TestDaemon::without_editor();
    let server = daemon.server();
    let response = server.get("/proxy/9999/").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("No running server"));
}

/// Insert a `running` instance bound to `port` without spawning anything.
/// The recorded pid is our own so liveness checks hold.
fn register_running_backend(daemon: &TestDaemon, port: u16) -> String {
    let id = wb_core::InstanceId::generate();
    let allocated = daemon.state.store.allocate_port(&id).unwrap();
    assert_eq!(allocated, port);
    let mut instance = wb_core::Instance::new(
        id.clone(),
        "backend",
        port,
        daemon.dir.path().join("workspace"),
        daemon.dir.path().join("data"),
    );
    instance.mark_running(std::process::id(), chrono::Utc::now(), vec![]);
    daemon.state.store.insert(instance).unwrap();
    id.as_str().to_string()
}

#[tokio::test]
async fn http_requests_pass_through_to_the_backend() {
    // Real backend on an OS-assigned port
    let backend = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_port = backend.local_addr().unwrap().port();
    let backend_app = axum::Router::new().route(
        "/hello",
        axum::routing::get(|headers: axum::http::HeaderMap| async move {
            let proto = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("missing")
                .to_string();
            format!("world via {}", proto)
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(backend, backend_app).await;
    });

    let daemon = TestDaemon::with_pinned_port(backend_port);
    register_running_backend(&daemon, backend_port);
    let server = daemon.server();

    let response = server.get(&format!("/proxy/{}/hello", backend_port)).await;
    response.assert_status_ok();
    response.assert_text("world via http");
}

#[tokio::test]
async fn websocket_frames_are_copied_verbatim() {
    // Echo backend: answers "ping" with "pong"
    let backend = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_port = backend.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = backend.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        let reply = if text.as_str() == "ping" { "pong" } else { text.as_str() };
                        if ws.send(Message::text(reply)).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    let daemon = TestDaemon::with_pinned_port(backend_port);
    register_running_backend(&daemon, backend_port);

    // The proxy must be reachable over real TCP for the upgrade
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    let app = router(daemon.state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let url = format!("ws://127.0.0.1:{}/proxy/{}/", proxy_addr.port(), backend_port);
    let (mut ws, _response) = tokio_tungstenite::connect_async(url).await.unwrap();

    ws.send(Message::text("ping")).await.unwrap();
    let reply = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(_)) => continue,
            other => panic!("unexpected websocket event: {:?}", other),
        }
    };
    assert_eq!(reply.as_str(), "pong");

    ws.send(Message::Close(None)).await.unwrap();
}
