// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Stable ordering of records.

use crate::record::Record;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    CreatedAt,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

fn compare(a: &Record, b: &Record, key: SortKey) -> Ordering {
    match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Duration => a.duration_ms.total_cmp(&b.duration_ms),
    }
}

/// Sort without reordering equal keys, in either direction.
pub fn sort(mut records: Vec<Arc<Record>>, key: SortKey, order: SortOrder) -> Vec<Arc<Record>> {
    match order {
        SortOrder::Ascending => records.sort_by(|a, b| compare(a, b, key)),
        SortOrder::Descending => records.sort_by(|a, b| compare(b, a, key)),
    }
    records
}
