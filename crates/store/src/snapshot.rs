// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable snapshot I/O.
//!
//! The snapshot is a whole-file JSON object mapping `id → Instance`.
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a reader of the durable file never observes a truncated record. A
//! missing file is equivalent to an empty registry.

use crate::error::StoreError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use wb_core::{Instance, InstanceId};

pub(crate) fn save_atomic(
    path: &Path,
    instances: &HashMap<InstanceId, Instance>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(instances)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn load(path: &Path) -> Result<HashMap<InstanceId, Instance>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
