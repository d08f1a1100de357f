// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Concurrent in-memory store of records.
//!
//! Records are kept newest first by first-seen time. Every mutation happens
//! under one write lock and is followed, after the lock is released, by a
//! payload-free `Changed` broadcast. Consumers react by taking a new snapshot.

use crate::record::{Record, RecordId};
use crate::snapshot::Snapshot;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Notification sent after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    Changed,
}

/// Callback fired once when a network record is first inserted.
///
/// It runs on the thread that inserted the record, after the ledger lock is
/// released, so it may read the ledger. It must not block: for requests that
/// thread is the one driving the exchange.
pub type NewRecordHook = Arc<dyn Fn(&Record) + Send + Sync>;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub struct Ledger {
    records: RwLock<VecDeque<Arc<Record>>>,
    max_records: usize,
    changes: broadcast::Sender<LedgerEvent>,
    new_record_hook: RwLock<Option<NewRecordHook>>,
}

impl Ledger {
    /// `max_records == 0` keeps every record.
    pub fn new(max_records: usize, channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records,
            changes,
            new_record_hook: RwLock::new(None),
        }
    }

    /// Insert a new record at the front, or replace the existing one with the
    /// same id in place. Replacement keeps the record's position.
    pub fn upsert(&self, record: Record) {
        let record = Arc::new(record);
        let inserted = match self.records.write() {
            Ok(mut records) => {
                if let Some(slot) = records.iter_mut().find(|r| r.id == record.id) {
                    *slot = Arc::clone(&record);
                    false
                } else {
                    records.push_front(Arc::clone(&record));
                    if self.max_records > 0 {
                        while records.len() > self.max_records {
                            if let Some(evicted) = records.pop_back() {
                                tracing::trace!(id = %evicted.id, "evicted oldest record");
                            }
                        }
                    }
                    true
                }
            }
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during upsert");
                return;
            }
        };

        if inserted && !record.is_log() {
            self.fire_new_record(&record);
        }
        self.notify();
    }

    /// Replace the record with the same id in place. A record that is no
    /// longer present (deleted, cleared or evicted) stays gone: returns false
    /// without notifying.
    pub fn update(&self, record: Record) -> bool {
        let id = record.id;
        let replaced = match self.records.write() {
            Ok(mut records) => match records.iter_mut().find(|r| r.id == id) {
                Some(slot) => {
                    *slot = Arc::new(record);
                    true
                }
                None => false,
            },
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during update");
                false
            }
        };
        if replaced {
            self.notify();
        } else {
            tracing::trace!(id = %id, "dropping update for a record no longer in the ledger");
        }
        replaced
    }

    /// Remove a record. Returns false, without notifying, when the id is unknown.
    pub fn delete(&self, id: RecordId) -> bool {
        let removed = match self.records.write() {
            Ok(mut records) => match records.iter().position(|r| r.id == id) {
                Some(index) => records.remove(index).is_some(),
                None => false,
            },
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during delete");
                false
            }
        };
        if removed {
            self.notify();
        }
        removed
    }

    /// Remove every record. Notifies exactly once.
    pub fn clear(&self) {
        match self.records.write() {
            Ok(mut records) => records.clear(),
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during clear");
                return;
            }
        }
        self.notify();
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.records.read() {
            Ok(records) => Snapshot::new(records.iter().cloned().collect()),
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during read");
                Snapshot::empty()
            }
        }
    }

    pub fn get(&self, id: RecordId) -> Option<Arc<Record>> {
        match self.records.read() {
            Ok(records) => records.iter().find(|r| r.id == id).cloned(),
            Err(_) => {
                tracing::warn!("Ledger lock poisoned during read");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive `Changed` after every mutation. Dropping the receiver
    /// unsubscribes. A receiver that falls behind sees `Lagged` and should
    /// simply take a fresh snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.changes.subscribe()
    }

    pub fn set_new_record_hook(&self, hook: Option<NewRecordHook>) {
        match self.new_record_hook.write() {
            Ok(mut slot) => *slot = hook,
            Err(_) => tracing::warn!("Ledger hook lock poisoned"),
        }
    }

    fn fire_new_record(&self, record: &Record) {
        let hook = match self.new_record_hook.read() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                tracing::warn!("Ledger hook lock poisoned");
                None
            }
        };
        if let Some(hook) = hook {
            hook(record);
        }
    }

    fn notify(&self) {
        // No subscribers is not an error.
        let _ = self.changes.send(LedgerEvent::Changed);
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(0, DEFAULT_CHANNEL_CAPACITY)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("len", &self.len())
            .field("max_records", &self.max_records)
            .finish()
    }
}
