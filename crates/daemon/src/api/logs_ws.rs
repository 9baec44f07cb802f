// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log streaming over WebSocket.
//!
//! Wire shape: one `{type: "initial_logs", logs: [...]}` frame on
//! connect, then `{type: "new_log", log: {...}}` per record. A client
//! that disconnects (or falls too far behind the bus) is dropped; log
//! delivery is best-effort.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::json;
use wb_core::InstanceId;

use crate::api::AppState;
use crate::logbus::LogBus;

pub(crate) async fn stream_all(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let bus = state.bus.clone();
    upgrade.on_upgrade(move |socket| stream(socket, bus, None))
}

pub(crate) async fn stream_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let bus = state.bus.clone();
    let filter = Some(InstanceId::from_string(instance_id));
    upgrade.on_upgrade(move |socket| stream(socket, bus, filter))
}

async fn stream(mut socket: WebSocket, bus: Arc<LogBus>, filter: Option<InstanceId>) {
    let (snapshot, mut rx) = bus.subscribe(filter);

    let initial = json!({"type": "initial_logs", "logs": snapshot});
    if socket.send(Message::Text(initial.to_string().into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            record = rx.recv() => {
                let Some(record) = record else {
                    // The bus dropped us (slow subscriber); nothing to salvage
                    break;
                };
                let frame = json!({"type": "new_log", "log": record});
                if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(_)) => {}
                    // Disconnect: dropping rx is the unsubscribe
                    _ => break,
                }
            }
        }
    }
}
