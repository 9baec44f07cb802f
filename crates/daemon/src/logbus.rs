// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory log bus: bounded ring plus subscriber fan-out.
//!
//! Emitters see a total order per bus. Subscribers get a one-shot snapshot
//! of the ring (optionally filtered by instance) followed by every record
//! emitted after their subscription. Delivery is best-effort: a subscriber
//! whose channel is full or closed is dropped, never waited on.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use wb_core::{InstanceId, LogRecord, LogSink};

use crate::instance_log::InstanceLogWriter;

/// Maximum records retained in the ring.
pub const MAX_RECORDS: usize = 10_000;

/// Per-subscriber channel depth before the subscriber is considered slow.
const SUBSCRIBER_BUFFER: usize = 256;

struct Subscriber {
    filter: Option<InstanceId>,
    tx: mpsc::Sender<LogRecord>,
}

impl Subscriber {
    fn wants(&self, record: &LogRecord) -> bool {
        match &self.filter {
            None => true,
            Some(id) => record.instance_id.as_ref() == Some(id),
        }
    }
}

struct BusInner {
    ring: VecDeque<LogRecord>,
    subscribers: Vec<Subscriber>,
}

/// Bounded fan-out channel of structured log records.
pub struct LogBus {
    inner: Mutex<BusInner>,
    capacity: usize,
}

impl LogBus {
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECORDS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner { ring: VecDeque::new(), subscribers: Vec::new() }),
            capacity,
        }
    }

    /// Append a record and broadcast it.
    ///
    /// When the ring is full, exactly one oldest record is evicted.
    /// Subscribers that cannot accept the record are dropped.
    pub fn emit(&self, record: LogRecord) {
        let mut inner = self.inner.lock();
        if inner.ring.len() >= self.capacity {
            inner.ring.pop_front();
        }
        inner.ring.push_back(record.clone());
        inner.subscribers.retain(|sub| {
            if !sub.wants(&record) {
                return true;
            }
            sub.tx.try_send(record.clone()).is_ok()
        });
    }

    /// Subscribe to the bus.
    ///
    /// Returns the initial snapshot (filtered when `filter` is set) and a
    /// live channel for subsequent records. Dropping the receiver is a
    /// clean unsubscribe; the next emit prunes the dead sender.
    pub fn subscribe(
        &self,
        filter: Option<InstanceId>,
    ) -> (Vec<LogRecord>, mpsc::Receiver<LogRecord>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        let snapshot = inner
            .ring
            .iter()
            .filter(|r| match &filter {
                None => true,
                Some(id) => r.instance_id.as_ref() == Some(id),
            })
            .cloned()
            .collect();
        inner.subscribers.push(Subscriber { filter, tx });
        (snapshot, rx)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().ring.is_empty()
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for LogBus {
    fn publish(&self, record: LogRecord) {
        self.emit(record);
    }
}

/// The daemon's production sink: every record goes to the bus, and records
/// carrying an instance id also land in that instance's log file.
pub struct DaemonLogSink {
    bus: Arc<LogBus>,
    files: Arc<InstanceLogWriter>,
}

impl DaemonLogSink {
    pub fn new(bus: Arc<LogBus>, files: Arc<InstanceLogWriter>) -> Self {
        Self { bus, files }
    }
}

impl LogSink for DaemonLogSink {
    fn publish(&self, record: LogRecord) {
        if record.instance_id.is_some() {
            self.files.append(&record);
        }
        self.bus.emit(record);
    }
}

#[cfg(test)]
#[path = "logbus_tests.rs"]
mod tests;
