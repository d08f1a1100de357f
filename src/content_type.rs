// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Payload classification from a raw `Content-Type` value.

use crate::helpers::headers::split_media_type;
use serde::Serialize;

/// Payload family derived from a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Json,
    Pdf,
    Image,
    Html,
    EncodedForm,
    Other,
}

/// A parsed content type: the lowercased primary part plus the raw header value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
    primary: String,
    raw: String,
}

impl ContentType {
    /// Parse a header value. Parameters after the first `;` are ignored for
    /// classification. Returns `None` when no primary type is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let (primary, _) = split_media_type(raw);
        if primary.is_empty() {
            return None;
        }
        Some(Self {
            primary: primary.to_ascii_lowercase(),
            raw: raw.trim().to_string(),
        })
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The header value as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_json(&self) -> bool {
        self.primary.contains("json")
    }

    pub fn is_pdf(&self) -> bool {
        self.primary.contains("pdf")
    }

    pub fn is_image(&self) -> bool {
        self.primary.starts_with("image/")
    }

    pub fn is_html(&self) -> bool {
        self.primary.contains("html")
    }

    pub fn is_encoded_form(&self) -> bool {
        self.primary == "application/x-www-form-urlencoded"
    }

    pub fn kind(&self) -> PayloadKind {
        if self.is_json() {
            PayloadKind::Json
        } else if self.is_pdf() {
            PayloadKind::Pdf
        } else if self.is_image() {
            PayloadKind::Image
        } else if self.is_html() {
            PayloadKind::Html
        } else if self.is_encoded_form() {
            PayloadKind::EncodedForm
        } else {
            PayloadKind::Other
        }
    }
}
