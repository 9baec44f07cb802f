// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use tempfile::tempdir;

fn sample() -> HashMap<InstanceId, Instance> {
    let id = InstanceId::from_string("srv-snap");
    let inst = Instance::new(
        id.clone(),
        "alpha",
        8500,
        PathBuf::from("/w/srv-snap"),
        PathBuf::from("/d/srv-snap"),
    );
    HashMap::from([(id, inst)])
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("instances.json");

    save_atomic(&path, &sample()).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded["srv-snap"].name, "alpha");
    assert_eq!(loaded["srv-snap"].port, 8500);
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("instances.json");
    save_atomic(&path, &sample()).unwrap();
    assert!(path.exists());
}

#[test]
fn save_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("instances.json");
    save_atomic(&path, &sample()).unwrap();
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn missing_file_loads_as_empty_map() {
    let dir = tempdir().unwrap();
    let loaded = load(&dir.path().join("absent.json")).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("instances.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(load(&path), Err(StoreError::Json(_))));
}

#[test]
fn save_is_a_total_rewrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("instances.json");
    save_atomic(&path, &sample()).unwrap();
    save_atomic(&path, &HashMap::new()).unwrap();
    assert!(load(&path).unwrap().is_empty());
}
