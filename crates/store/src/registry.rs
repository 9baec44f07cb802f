// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authoritative in-memory instance registry.
//!
//! Reads take the shared lock and return clones; every mutation takes the
//! exclusive lock. The `port → id` index lives next to the instance map so
//! insert/remove update both under one critical section, which is what
//! keeps port uniqueness airtight under concurrent create/delete.

use crate::error::StoreError;
use crate::ports::{PortCursor, PortRange};
use crate::snapshot;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use wb_core::{Instance, InstanceId};

struct Registry {
    instances: HashMap<InstanceId, Instance>,
    by_port: HashMap<u16, InstanceId>,
    cursor: PortCursor,
}

/// Durable map of instance metadata plus the port index.
pub struct InstanceStore {
    inner: RwLock<Registry>,
    range: PortRange,
    snapshot_path: PathBuf,
}

impl InstanceStore {
    pub fn new(snapshot_path: PathBuf, range: PortRange) -> Self {
        Self {
            inner: RwLock::new(Registry {
                instances: HashMap::new(),
                by_port: HashMap::new(),
                cursor: PortCursor::new(range),
            }),
            range,
            snapshot_path,
        }
    }

    pub fn port_range(&self) -> PortRange {
        self.range
    }

    /// Snapshot of all instances; ordering not guaranteed.
    pub fn list(&self) -> Vec<Instance> {
        self.inner.read().instances.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Result<Instance, StoreError> {
        self.inner
            .read()
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn get_by_port(&self, port: u16) -> Result<Instance, StoreError> {
        let inner = self.inner.read();
        inner
            .by_port
            .get(&port)
            .and_then(|id| inner.instances.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("port {}", port)))
    }

    /// Reserve a port for `id` in the secondary index.
    ///
    /// The reservation is keyed by the instance id, so whatever a
    /// best-effort port cleanup does to stranger processes later, the port
    /// stays assigned to this instance. Roll back with [`release_port`]
    /// if create fails before insert.
    ///
    /// [`release_port`]: InstanceStore::release_port
    pub fn allocate_port(&self, id: &InstanceId) -> Result<u16, StoreError> {
        let mut inner = self.inner.write();
        let port = {
            let Registry { by_port, cursor, .. } = &mut *inner;
            cursor.allocate(self.range, by_port)?
        };
        inner.by_port.insert(port, id.clone());
        Ok(port)
    }

    /// Drop a reservation that never became an instance.
    pub fn release_port(&self, port: u16) {
        self.inner.write().by_port.remove(&port);
    }

    /// Add a new instance. Fails `Conflict` on id or port collision.
    pub fn insert(&self, instance: Instance) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.instances.contains_key(&instance.id) {
            return Err(StoreError::Conflict(format!("instance {} already exists", instance.id)));
        }
        match inner.by_port.get(&instance.port) {
            Some(holder) if holder != &instance.id => {
                return Err(StoreError::Conflict(format!(
                    "port {} already assigned to {}",
                    instance.port, holder
                )));
            }
            _ => {}
        }
        inner.by_port.insert(instance.port, instance.id.clone());
        inner.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    /// Apply a mutation under the exclusive lock; returns the updated copy.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<Instance, StoreError>
    where
        F: FnOnce(&mut Instance),
    {
        let mut inner = self.inner.write();
        let instance = inner
            .instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        mutate(instance);
        Ok(instance.clone())
    }

    /// Drop an instance and release its port index slot.
    pub fn remove(&self, id: &str) -> Result<Instance, StoreError> {
        let mut inner = self.inner.write();
        let instance = inner
            .instances
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if inner.by_port.get(&instance.port).is_some_and(|holder| holder == &instance.id) {
            inner.by_port.remove(&instance.port);
        }
        Ok(instance)
    }

    /// Serialize the whole registry to the durable file atomically.
    pub fn snapshot(&self) -> Result<(), StoreError> {
        let inner = self.inner.write();
        snapshot::save_atomic(&self.snapshot_path, &inner.instances)
    }

    /// Replace the in-memory registry from the durable snapshot.
    ///
    /// Rebuilds the port index, bumps the allocation cursor past the
    /// highest observed port, and carries over in-process samples for any
    /// running instance whose pid is unchanged across the reload.
    pub fn reload(&self) -> Result<(), StoreError> {
        let mut loaded = snapshot::load(&self.snapshot_path)?;
        let mut inner = self.inner.write();

        let mut by_port = HashMap::with_capacity(loaded.len());
        let mut cursor = PortCursor::new(self.range);
        for (id, inst) in &loaded {
            by_port.insert(inst.port, id.clone());
            cursor.bump_past(inst.port);
        }

        for (id, inst) in loaded.iter_mut() {
            if !inst.is_running() {
                continue;
            }
            if let Some(prior) = inner.instances.get(id.as_str()) {
                if prior.is_running() && prior.pid == inst.pid {
                    inst.adopt_samples_from(prior);
                }
            }
        }

        inner.instances = loaded;
        inner.by_port = by_port;
        inner.cursor = cursor;
        tracing::debug!(instances = inner.instances.len(), "registry reloaded from snapshot");
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
