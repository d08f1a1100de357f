// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Point-in-time view of the ledger.
//!
//! A snapshot is detached from the ledger: later upserts never show up in it,
//! and holding one never blocks writers.

use crate::record::{Record, RecordId};
use std::ops::Deref;
use std::sync::Arc;

/// Records ordered **newest first**, as they were when the snapshot was taken.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<Arc<Record>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from a pre-sorted (newest-first) list of records.
    pub fn new(entries: Vec<Arc<Record>>) -> Self {
        Self { entries }
    }

    /// The most recently inserted record, if any.
    pub fn newest(&self) -> Option<&Arc<Record>> {
        self.entries.first()
    }

    pub fn get(&self, id: RecordId) -> Option<&Arc<Record>> {
        self.entries.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[Arc<Record>] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Arc<Record>> {
        self.entries
    }
}

impl Deref for Snapshot {
    type Target = [Arc<Record>];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}
