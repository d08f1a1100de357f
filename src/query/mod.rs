// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Pure filtering and ordering over ledger snapshots.
//!
//! Nothing here touches the ledger: every function takes records and returns
//! a new list, so the same inputs always give the same output.

pub mod filter;
pub mod sort;

pub use filter::{filter_by_category, filter_by_search, Category};
pub use sort::{sort, SortKey, SortOrder};

use crate::record::Record;
use crate::snapshot::Snapshot;
use std::sync::Arc;

/// A composed view: category, then search, then sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub category: Category,
    pub search: Option<String>,
    pub sort: Option<(SortKey, SortOrder)>,
}

impl Query {
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn sorted(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some((key, order));
        self
    }

    pub fn apply(&self, snapshot: &Snapshot) -> Vec<Arc<Record>> {
        let mut records = filter_by_category(snapshot, self.category);
        if let Some(text) = &self.search {
            records = filter_by_search(&records, text);
        }
        match self.sort {
            Some((key, order)) => sort(records, key, order),
            None => records,
        }
    }
}
