// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Canonical record of a captured exchange or synthetic log entry.

use crate::content_type::ContentType;
use crate::error::TransportError;
use crate::helpers::headers::{find_header, headers_to_map};
use crate::metrics::Metrics;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use hyper::{HeaderMap, Request, Uri};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Method value reserved for log and custom-event records.
///
/// The query layer partitions network traffic from log traffic on this value.
pub const LOG_METHOD: &str = "log";

/// Header-like string mapping. Key order carries no meaning; a sorted map keeps
/// exports deterministic.
pub type Headers = BTreeMap<String, String>;

/// Stable identity of a record, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    NetworkRequest,
    CustomEvent,
    LogMessage,
}

/// Lifecycle state derived from the status code, or forced to `Failure` by an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Pending,
    Success,
    Failure,
}

impl RecordState {
    /// 100..=399 is success, anything else (including the -1 sentinel) is failure.
    pub fn from_status(code: i32) -> Self {
        if (100..400).contains(&code) {
            RecordState::Success
        } else {
            RecordState::Failure
        }
    }
}

/// Response body accumulated chunk by chunk, in arrival order.
///
/// Cloning shares the chunk buffers, so publishing a record after every chunk
/// does not copy the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedBody {
    chunks: Vec<Bytes>,
    len: usize,
}

impl ChunkedBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Concatenate all chunks into one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [only] => only.clone(),
            many => {
                let mut out = BytesMut::with_capacity(self.len);
                for chunk in many {
                    out.extend_from_slice(chunk);
                }
                out.freeze()
            }
        }
    }
}

impl From<Bytes> for ChunkedBody {
    fn from(bytes: Bytes) -> Self {
        let mut body = Self::new();
        body.append(bytes);
        body
    }
}

/// Logical level of a synthetic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Analytic,
    Debug,
    Custom,
}

impl LogLevel {
    /// Title used in place of a network scheme on log records.
    pub fn title(self) -> &'static str {
        match self {
            LogLevel::Analytic => "analytic",
            LogLevel::Debug => "debug",
            LogLevel::Custom => "custom",
        }
    }
}

/// An entry emitted explicitly by application code instead of captured traffic.
#[derive(Debug, Clone)]
pub struct CustomEntry {
    pub level: LogLevel,
    pub label: String,
    pub message: String,
    pub parameters: Headers,
    pub metadata: Bytes,
}

impl CustomEntry {
    pub fn new(level: LogLevel, label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            label: label.into(),
            message: message.into(),
            parameters: Headers::new(),
            metadata: Bytes::new(),
        }
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// Normalized capture of one exchange or log entry.
///
/// `state`, `error` and completion are private so the failure-is-sticky and
/// no-writes-after-completion rules cannot be bypassed.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    pub url: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub scheme: Option<String>,
    pub method: String,
    pub created_at: DateTime<Utc>,
    state: RecordState,
    completed: bool,
    pub duration_ms: f64,
    pub request_headers: Headers,
    pub response_headers: Headers,
    #[serde(serialize_with = "crate::serde_helpers::serialize_body")]
    pub request_body: Option<Bytes>,
    #[serde(serialize_with = "crate::serde_helpers::serialize_chunked_body")]
    pub response_body: Option<ChunkedBody>,
    /// -1 until a response status is known.
    pub status_code: i32,
    #[serde(serialize_with = "crate::serde_helpers::serialize_error")]
    error: Option<TransportError>,
    pub metrics: Option<Arc<Metrics>>,
    pub cookies: Option<String>,
}

impl Record {
    fn blank(id: RecordId, kind: RecordKind, url: String, method: String) -> Self {
        Self {
            id,
            kind,
            url,
            host: None,
            port: None,
            path: None,
            scheme: None,
            method,
            created_at: Utc::now(),
            state: RecordState::Pending,
            completed: false,
            duration_ms: 0.0,
            request_headers: Headers::new(),
            response_headers: Headers::new(),
            request_body: None,
            response_body: None,
            status_code: -1,
            error: None,
            metrics: None,
            cookies: None,
        }
    }

    fn fill_from_uri(&mut self, uri: &Uri) {
        self.host = uri.host().map(str::to_string);
        self.port = uri.port_u16();
        self.path = uri.authority().map(|_| uri.path().to_string());
        self.scheme = uri.scheme_str().map(str::to_string);
    }

    /// Pending record for an outgoing request, capturing the body when asked to.
    pub fn from_request(id: RecordId, request: &Request<Bytes>, capture_body: bool) -> Self {
        let mut record = Self::blank(
            id,
            RecordKind::NetworkRequest,
            request.uri().to_string(),
            request.method().as_str().to_string(),
        );
        record.fill_from_uri(request.uri());
        record.request_headers = headers_to_map(request.headers());
        if capture_body && !request.body().is_empty() {
            record.request_body = Some(request.body().clone());
        }
        record
    }

    /// Finished log record: the label stands in for the host, the level title for
    /// the scheme, parameters and metadata for the response.
    pub fn from_entry(entry: &CustomEntry) -> Self {
        let mut record = Self::blank(
            RecordId::new(),
            RecordKind::LogMessage,
            entry.message.clone(),
            LOG_METHOD.to_string(),
        );
        record.host = Some(entry.label.clone());
        record.scheme = Some(entry.level.title().to_string());
        record.response_headers = entry.parameters.clone();
        if !entry.metadata.is_empty() {
            record.response_body = Some(ChunkedBody::from(entry.metadata.clone()));
        }
        record.state = RecordState::Success;
        record.completed = true;
        record
    }

    /// Finished custom-event record for an application supplied URL.
    pub fn custom_event(uri: &Uri, body: Option<Bytes>, parameters: Headers) -> Self {
        let mut record = Self::blank(
            RecordId::new(),
            RecordKind::CustomEvent,
            uri.to_string(),
            LOG_METHOD.to_string(),
        );
        record.fill_from_uri(uri);
        record.response_headers = parameters;
        record.response_body = body.filter(|b| !b.is_empty()).map(ChunkedBody::from);
        record.state = RecordState::Success;
        record.completed = true;
        record
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// True once the exchange has finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_log(&self) -> bool {
        self.method == LOG_METHOD
    }

    /// Record status and headers. A recorded error keeps the state at `Failure`.
    pub fn apply_response(&mut self, status: u16, headers: &HeaderMap) {
        if self.completed {
            return;
        }
        self.status_code = i32::from(status);
        self.response_headers = headers_to_map(headers);
        if self.error.is_none() {
            self.state = RecordState::from_status(self.status_code);
        }
    }

    /// Append a response chunk. Returns false, leaving the body untouched, once
    /// the record is complete.
    pub fn append_body(&mut self, chunk: Bytes) -> bool {
        if self.completed {
            return false;
        }
        self.response_body
            .get_or_insert_with(ChunkedBody::new)
            .append(chunk);
        true
    }

    pub fn set_error(&mut self, error: TransportError) {
        self.error = Some(error);
        self.state = RecordState::Failure;
    }

    /// Successful completion: final duration and optional metrics.
    pub fn finish(&mut self, duration_ms: f64, metrics: Option<Arc<Metrics>>) {
        self.duration_ms = duration_ms;
        if metrics.is_some() {
            self.metrics = metrics;
        }
        self.completed = true;
    }

    /// Failed completion: the error forces `Failure`.
    pub fn fail(&mut self, error: TransportError, duration_ms: f64) {
        self.set_error(error);
        self.duration_ms = duration_ms;
        self.completed = true;
    }

    pub fn response_content_type(&self) -> Option<ContentType> {
        find_header(&self.response_headers, "content-type").and_then(ContentType::parse)
    }

    pub fn request_content_type(&self) -> Option<ContentType> {
        find_header(&self.request_headers, "content-type").and_then(ContentType::parse)
    }
}
