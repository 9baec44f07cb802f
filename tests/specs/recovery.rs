// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash and restart convergence specs.

use crate::prelude::*;
use wb_daemon::supervisor::metrics::spawn_metrics_loop;

#[tokio::test]
async fn externally_killed_child_converges_and_neighbors_survive() {
    let daemon = TestDaemon::with_editor_body("sleep 30");
    let server = daemon.server();

    let beta = create_instance(&server, "beta").await;
    let gamma = create_instance(&server, "gamma").await;
    let beta_id = beta["id"].as_str().unwrap();
    let gamma_id = gamma["id"].as_str().unwrap();

    let beta_pid = server
        .post(&format!("/servers/{}/start", beta_id))
        .await
        .json::<Value>()["pid"]
        .as_u64()
        .unwrap();
    server.post(&format!("/servers/{}/start", gamma_id)).await.assert_status_ok();

    // Kill beta's child out from under the supervisor
    let _ = std::process::Command::new("kill")
        .args(["-9", &beta_pid.to_string()])
        .status();

    let beta_after = wait_for(&daemon.state.store, beta_id, |i| !i.is_running()).await;
    assert_eq!(beta_after.status, InstanceStatus::Failed);
    assert!(beta_after.pid.is_none());
    assert!(beta_after.start_time.is_none());

    // Gamma is untouched
    let gamma_after = daemon.state.store.get(gamma_id).unwrap();
    assert_eq!(gamma_after.status, InstanceStatus::Running);

    let _ = server.post(&format!("/servers/{}/stop", gamma_id)).await;
}

#[tokio::test]
async fn restart_reconciles_the_reloaded_registry_within_one_tick() {
    let daemon = TestDaemon::without_editor();
    let server = daemon.server();

    let stale = create_instance(&server, "stale").await;
    let alive = create_instance(&server, "alive").await;
    let stale_id = stale["id"].as_str().unwrap();
    let alive_id = alive["id"].as_str().unwrap();

    // Forge a pre-crash world: one child that no longer exists, one that
    // does (borrowing our own pid).
    daemon
        .state
        .store
        .update(stale_id, |i| i.mark_running(999_999_999, chrono::Utc::now(), vec![]))
        .unwrap();
    daemon
        .state
        .store
        .update(alive_id, |i| {
            i.mark_running(std::process::id(), chrono::Utc::now(), vec![])
        })
        .unwrap();
    daemon.state.store.snapshot().unwrap();

    // "Restart the control process": fresh store and supervisor over the
    // same durable file.
    let config = test_config(
        daemon.dir.path(),
        "/nonexistent/editor-binary".to_string(),
        PortRange::new(8500, 8999),
    );
    let reborn = build_app_state(config);
    reborn.store.reload().unwrap();
    assert_eq!(
        reborn.store.get(stale_id).unwrap().status,
        InstanceStatus::Running,
        "the durable file still claims the dead child is running"
    );

    spawn_metrics_loop(reborn.supervisor.clone(), Duration::from_millis(50));

    let stale_after = wait_for(&reborn.store, stale_id, |i| !i.is_running()).await;
    assert_eq!(stale_after.status, InstanceStatus::Stopped);
    assert!(stale_after.pid.is_none());

    // The instance whose pid is still alive stays running
    let alive_after = reborn.store.get(alive_id).unwrap();
    assert_eq!(alive_after.status, InstanceStatus::Running);
}
