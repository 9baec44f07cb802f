// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn test_store() -> (InstanceStore, TempDir) {
    let dir = tempdir().unwrap();
    let store = InstanceStore::new(
        dir.path().join("instances.json"),
        PortRange::new(8500, 8999),
    );
    (store, dir)
}

fn create(store: &InstanceStore, name: &str) -> Instance {
    let id = InstanceId::generate();
    let port = store.allocate_port(&id).unwrap();
    let inst = Instance::new(
        id,
        name,
        port,
        PathBuf::from(format!("/w/{}", name)),
        PathBuf::from(format!("/d/{}", name)),
    );
    store.insert(inst.clone()).unwrap();
    inst
}

#[test]
fn first_allocation_is_range_start() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    assert_eq!(inst.port, 8500);
}

#[test]
fn get_and_get_by_port_agree() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    assert_eq!(store.get(inst.id.as_str()).unwrap().name, "alpha");
    assert_eq!(store.get_by_port(inst.port).unwrap().id, inst.id);
}

#[test]
fn get_unknown_is_not_found() {
    let (store, _dir) = test_store();
    assert!(matches!(store.get("srv-nope"), Err(StoreError::NotFound(_))));
    assert!(matches!(store.get_by_port(9999), Err(StoreError::NotFound(_))));
}

#[test]
fn ports_are_unique_across_live_instances() {
    let (store, _dir) = test_store();
    let mut seen = HashSet::new();
    for i in 0..20 {
        let inst = create(&store, &format!("inst-{}", i));
        assert!(seen.insert(inst.port), "port {} handed out twice", inst.port);
    }
}

#[test]
fn insert_duplicate_id_conflicts() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    let mut dup = inst.clone();
    dup.port = 8600;
    assert!(matches!(store.insert(dup), Err(StoreError::Conflict(_))));
}

#[test]
fn insert_on_foreign_reservation_conflicts() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    let other = Instance::new(
        InstanceId::generate(),
        "beta",
        inst.port,
        PathBuf::from("/w/beta"),
        PathBuf::from("/d/beta"),
    );
    assert!(matches!(store.insert(other), Err(StoreError::Conflict(_))));
}

#[test]
fn released_reservation_frees_the_slot() {
    let (store, _dir) = test_store();
    let id = InstanceId::generate();
    let port = store.allocate_port(&id).unwrap();
    store.release_port(port);
    assert!(matches!(store.get_by_port(port), Err(StoreError::NotFound(_))));
}

#[test]
fn update_mutates_under_lock_and_returns_copy() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    let updated = store
        .update(inst.id.as_str(), |i| i.mark_running(99, Utc::now(), vec!["bin".into()]))
        .unwrap();
    assert_eq!(updated.pid, Some(99));
    assert_eq!(store.get(inst.id.as_str()).unwrap().pid, Some(99));
}

#[test]
fn update_unknown_is_not_found() {
    let (store, _dir) = test_store();
    assert!(matches!(store.update("srv-nope", |_| {}), Err(StoreError::NotFound(_))));
}

#[test]
fn remove_frees_the_port_index() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    store.remove(inst.id.as_str()).unwrap();
    assert!(matches!(store.get(inst.id.as_str()), Err(StoreError::NotFound(_))));
    assert!(matches!(store.get_by_port(inst.port), Err(StoreError::NotFound(_))));
}

#[test]
fn snapshot_then_reload_round_trips() {
    let (store, _dir) = test_store();
    let a = create(&store, "alpha");
    let b = create(&store, "beta");
    store.snapshot().unwrap();

    store.reload().unwrap();
    let names: HashSet<String> = store.list().into_iter().map(|i| i.name).collect();
    assert_eq!(names, HashSet::from(["alpha".to_string(), "beta".to_string()]));
    assert_eq!(store.get(a.id.as_str()).unwrap().port, a.port);
    assert_eq!(store.get_by_port(b.port).unwrap().id, b.id);
}

#[test]
fn reload_bumps_cursor_past_highest_port() {
    let (store, _dir) = test_store();
    let a = create(&store, "alpha");
    let _b = create(&store, "beta");
    store.snapshot().unwrap();

    // Fresh process over the same durable file
    let reopened = InstanceStore::new(
        store.snapshot_path.clone(),
        PortRange::new(8500, 8999),
    );
    reopened.reload().unwrap();
    let c_id = InstanceId::generate();
    let port = reopened.allocate_port(&c_id).unwrap();
    assert_eq!(port, a.port + 2);
}

#[test]
fn reload_preserves_samples_for_surviving_children() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    store
        .update(inst.id.as_str(), |i| {
            i.mark_running(4242, Utc::now(), vec![]);
        })
        .unwrap();
    store.snapshot().unwrap();
    // Samples recorded after the snapshot exist only in memory
    store
        .update(inst.id.as_str(), |i| i.record_sample(2.5, 300.0, 60, Utc::now()))
        .unwrap();

    store.reload().unwrap();
    let after = store.get(inst.id.as_str()).unwrap();
    assert_eq!(after.cpu_percent, Some(2.5));
    assert_eq!(after.memory_mb, Some(300.0));
    assert_eq!(after.uptime_seconds, Some(60));
}

#[test]
fn reload_drops_samples_when_pid_changed() {
    let (store, _dir) = test_store();
    let inst = create(&store, "alpha");
    store
        .update(inst.id.as_str(), |i| i.mark_running(1, Utc::now(), vec![]))
        .unwrap();
    store.snapshot().unwrap();
    // A different child in memory than on disk: samples must not carry over
    store
        .update(inst.id.as_str(), |i| {
            i.mark_running(2, Utc::now(), vec![]);
            i.record_sample(9.0, 900.0, 90, Utc::now());
        })
        .unwrap();

    store.reload().unwrap();
    let after = store.get(inst.id.as_str()).unwrap();
    assert_eq!(after.pid, Some(1));
    assert!(after.cpu_percent.is_none());
}

#[test]
fn reload_with_missing_file_is_empty() {
    let (store, _dir) = test_store();
    create(&store, "alpha");
    store.reload().unwrap();
    assert!(store.list().is_empty());
}
