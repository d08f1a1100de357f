// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Category and free-text filters.

use crate::helpers::headers::find_header;
use crate::record::Record;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    /// Captured traffic only.
    Network,
    /// Log records and custom events only.
    Log,
    #[default]
    All,
}

impl Category {
    pub fn matches(self, record: &Record) -> bool {
        match self {
            Category::Network => !record.is_log(),
            Category::Log => record.is_log(),
            Category::All => true,
        }
    }
}

pub fn filter_by_category(records: &[Arc<Record>], category: Category) -> Vec<Arc<Record>> {
    records
        .iter()
        .filter(|r| category.matches(r))
        .cloned()
        .collect()
}

/// Case-insensitive substring match over URL, method, scheme, host and
/// response content type, or an exact match on the status code when the
/// text is a number. Blank text matches everything.
pub fn filter_by_search(records: &[Arc<Record>], text: &str) -> Vec<Arc<Record>> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    let status = needle.parse::<i32>().ok();
    records
        .iter()
        .filter(|r| matches_search(r, &needle, status))
        .cloned()
        .collect()
}

fn matches_search(record: &Record, needle: &str, status: Option<i32>) -> bool {
    if status == Some(record.status_code) {
        return true;
    }
    let contains = |s: &str| s.to_lowercase().contains(needle);
    contains(&record.url)
        || contains(&record.method)
        || record.scheme.as_deref().is_some_and(contains)
        || record.host.as_deref().is_some_and(contains)
        || find_header(&record.response_headers, "content-type").is_some_and(contains)
}
