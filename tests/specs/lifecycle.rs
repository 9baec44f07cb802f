// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance lifecycle specs: create, start, stop, delete.

use crate::prelude::*;

#[tokio::test]
async fn create_lays_out_instance_on_first_port() {
    let daemon = TestDaemon::without_editor();
    let server = daemon.server();

    let created = create_instance(&server, "alpha").await;
    assert_eq!(created["port"], 8500);
    assert_eq!(created["status"], "stopped");

    let id = created["id"].as_str().unwrap();
    assert!(daemon.dir.path().join("workspace").join(id).is_dir());
    assert!(daemon.dir.path().join("data").join(id).is_dir());

    // The mutation is durable before the call returns
    let snapshot =
        std::fs::read_to_string(daemon.dir.path().join("data").join("instances.json")).unwrap();
    assert!(snapshot.contains(id));
}

#[tokio::test]
async fn ports_stay_unique_across_concurrent_creates() {
    let daemon = TestDaemon::without_editor();
    let server = Arc::new(daemon.server());

    let mut handles = Vec::new();
    for i in 0..8 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let response = server
                .post("/servers")
                .json(&json!({"name": format!("inst-{}", i)}))
                .await;
            response.json::<Value>()["port"].as_u64().unwrap()
        }));
    }

    let mut ports = Vec::new();
    for handle in handles {
        ports.push(handle.await.unwrap());
    }
    ports.sort_unstable();
    ports.dedup();
    assert_eq!(ports.len(), 8, "every instance got a distinct port");
}

#[tokio::test]
async fn start_then_stop_converges_and_second_stop_conflicts() {
    let daemon = TestDaemon::with_editor_body("sleep 30");
    let server = daemon.server();

    let created = create_instance(&server, "alpha").await;
    let id = created["id"].as_str().unwrap();

    let started = server.post(&format!("/servers/{}/start", id)).await;
    started.assert_status_ok();
    let body = started.json::<Value>();
    assert_eq!(body["status"], "running");
    let pid = body["pid"].as_u64().unwrap() as u32;
    assert!(pid_exists(pid));
    assert!(body["start_time"].is_string());

    let stopped = server.post(&format!("/servers/{}/stop", id)).await;
    stopped.assert_status_ok();
    let body = stopped.json::<Value>();
    assert_eq!(body["status"], "stopped");
    assert!(body.get("pid").is_none());

    // The SIGTERM lands quickly on the stub
    for _ in 0..100 {
        if !pid_exists(pid) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!pid_exists(pid));

    // Idempotent stop: conflict, no state change
    let again = server.post(&format!("/servers/{}/stop", id)).await;
    again.assert_status(axum::http::StatusCode::CONFLICT);
    assert_eq!(
        daemon.state.store.get(id).unwrap().status,
        InstanceStatus::Stopped
    );
}

#[tokio::test]
async fn restart_spawns_a_fresh_child() {
    let daemon = TestDaemon::with_editor_body("sleep 30");
    let server = daemon.server();

    let created = create_instance(&server, "alpha").await;
    let id = created["id"].as_str().unwrap();

    let first = server.post(&format!("/servers/{}/start", id)).await.json::<Value>();
    let first_pid = first["pid"].as_u64().unwrap();

    let restarted = server.post(&format!("/servers/{}/restart", id)).await;
    restarted.assert_status_ok();
    let second = restarted.json::<Value>();
    assert_eq!(second["status"], "running");
    assert_ne!(second["pid"].as_u64().unwrap(), first_pid);

    let _ = server.post(&format!("/servers/{}/stop", id)).await;
}

#[tokio::test]
async fn delete_tears_down_directories_and_frees_the_record() {
    let daemon = TestDaemon::with_editor_body("sleep 30");
    let server = daemon.server();

    let created = create_instance(&server, "alpha").await;
    let id = created["id"].as_str().unwrap();
    server.post(&format!("/servers/{}/start", id)).await.assert_status_ok();

    server.delete(&format!("/servers/{}", id)).await.assert_status_ok();

    assert!(!daemon.dir.path().join("workspace").join(id).exists());
    assert!(!daemon.dir.path().join("data").join(id).exists());
    assert!(daemon.state.store.get(id).is_err());
}
