// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Renderings of records and metrics for sharing outside the process.

pub mod jsonl;
pub mod metrics;
pub mod shell;
pub mod text;

pub use jsonl::{to_json_line, write_json_lines};
pub use metrics::to_metrics_text;
pub use shell::to_shell_command;
pub use text::to_text;

use crate::format::{format_millis, status_code_string};
use crate::record::{Headers, Record};
use std::collections::BTreeMap;

/// `key: value` lines, or the empty-section marker.
pub(crate) fn render_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    if out.is_empty() {
        out.push_str(crate::body::EMPTY_SECTION);
        out.push('\n');
    }
    out
}

pub(crate) fn render_headers(headers: &Headers) -> String {
    render_pairs(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Overview block shared by the text and metrics exports. Keys are listed in
/// descending order.
pub(crate) fn overview(record: &Record) -> String {
    let mut fields: BTreeMap<&str, String> = BTreeMap::new();
    fields.insert("Date", record.created_at.format("%H:%M:%S").to_string());
    fields.insert("URL", record.url.clone());
    fields.insert("Method", record.method.clone());
    if record.status_code != -1 {
        fields.insert("Response code", status_code_string(record.status_code));
    }
    if record.duration_ms != 0.0 {
        fields.insert("Duration", format_millis(record.duration_ms));
    }
    if let Some(err) = record.error() {
        fields.insert("Error", err.to_string());
    }
    render_pairs(fields.iter().rev().map(|(k, v)| (*k, v.as_str())))
}
