// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Body rendering for exports and read-only consumers.
//!
//! Every function here degrades to a fallback instead of failing: malformed
//! JSON becomes text, non-UTF-8 text becomes a size label.

use crate::content_type::{ContentType, PayloadKind};
use crate::format::format_bytes;
use serde_json::Value;

/// Placeholder for an absent or empty section.
pub const EMPTY_SECTION: &str = "-";

/// A body decoded according to its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
    Binary { len: usize, kind: PayloadKind },
}

/// Decode `bytes` into the richest structure its content type allows.
pub fn structure(bytes: &[u8], content_type: Option<&ContentType>) -> StructuredBody {
    let kind = content_type.map_or(PayloadKind::Other, ContentType::kind);
    match kind {
        PayloadKind::Json => match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => StructuredBody::Json(value),
            Err(_) => text_or_binary(bytes, kind),
        },
        PayloadKind::EncodedForm => StructuredBody::Form(
            url::form_urlencoded::parse(bytes)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        ),
        PayloadKind::Pdf | PayloadKind::Image => StructuredBody::Binary {
            len: bytes.len(),
            kind,
        },
        PayloadKind::Html | PayloadKind::Other => text_or_binary(bytes, kind),
    }
}

fn text_or_binary(bytes: &[u8], kind: PayloadKind) -> StructuredBody {
    match std::str::from_utf8(bytes) {
        Ok(text) => StructuredBody::Text(text.to_string()),
        Err(_) => StructuredBody::Binary {
            len: bytes.len(),
            kind,
        },
    }
}

/// Pretty JSON, or `None` when `bytes` is not a JSON document.
pub fn pretty_json(bytes: &[u8]) -> Option<String> {
    let value = serde_json::from_slice::<Value>(bytes).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// UTF-8 text when possible, otherwise a size label.
pub fn text_fallback(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} of binary data>", format_bytes(bytes.len() as i64)),
    }
}

/// Body section for text exports.
///
/// JSON bodies are pretty-printed; other labelled bodies show their content
/// type; unlabelled bodies fall back to text.
pub fn render_section(body: Option<&[u8]>, content_type: Option<&ContentType>) -> String {
    let bytes = match body {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return EMPTY_SECTION.to_string(),
    };
    match content_type {
        Some(ct) if ct.is_json() => pretty_json(bytes).unwrap_or_else(|| text_fallback(bytes)),
        Some(ct) => ct.raw().to_string(),
        None => text_fallback(bytes),
    }
}
