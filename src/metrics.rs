// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Timing and transfer data collected for an exchange.
//!
//! A `Metrics` value is built once by the transport when the exchange
//! completes and is shared immutably behind an `Arc` afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub task_interval: TaskInterval,
    pub redirect_count: u32,
    /// One entry per request attempt, redirects included, in order.
    pub transactions: Vec<TransactionMetrics>,
}

impl Metrics {
    /// Transfer sizes summed across every transaction.
    pub fn total_transfer_size(&self) -> TransferSize {
        self.transactions
            .iter()
            .fold(TransferSize::default(), |acc, t| acc.merging(&t.transfer_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TaskInterval {
    /// Elapsed seconds, never negative.
    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start, self.end).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchType {
    NetworkLoad,
    LocalCache,
    ServerPush,
    #[default]
    Unknown,
}

impl FetchType {
    pub fn title(self) -> &'static str {
        match self {
            FetchType::NetworkLoad => "Network Load",
            FetchType::LocalCache => "Cache Lookup",
            FetchType::ServerPush => "Server Push",
            FetchType::Unknown => "Unknown Fetch Type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionMetrics {
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub fetch_type: FetchType,
    pub network_protocol: Option<String>,
    pub timing: TransactionTiming,
    pub transfer_size: TransferSize,
    pub conditions: Conditions,
    pub local_address: Option<String>,
    pub local_port: Option<u16>,
    pub remote_address: Option<String>,
    pub remote_port: Option<u16>,
}

/// Phase timestamps of a single transaction. Phases the transport could not
/// observe stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransactionTiming {
    pub fetch_start: Option<DateTime<Utc>>,
    pub domain_lookup_start: Option<DateTime<Utc>>,
    pub domain_lookup_end: Option<DateTime<Utc>>,
    pub connect_start: Option<DateTime<Utc>>,
    pub secure_connection_start: Option<DateTime<Utc>>,
    pub secure_connection_end: Option<DateTime<Utc>>,
    pub connect_end: Option<DateTime<Utc>>,
    pub request_start: Option<DateTime<Utc>>,
    pub request_end: Option<DateTime<Utc>>,
    pub response_start: Option<DateTime<Utc>>,
    pub response_end: Option<DateTime<Utc>>,
}

impl TransactionTiming {
    /// Labelled phases in chronological order.
    pub fn phases(&self) -> [(&'static str, Option<DateTime<Utc>>); 11] {
        [
            ("Fetch Start", self.fetch_start),
            ("Domain Lookup Start", self.domain_lookup_start),
            ("Domain Lookup End", self.domain_lookup_end),
            ("Connect Start", self.connect_start),
            ("Secure Connect Start", self.secure_connection_start),
            ("Secure Connect End", self.secure_connection_end),
            ("Connect End", self.connect_end),
            ("Request Start", self.request_start),
            ("Request End", self.request_end),
            ("Response Start", self.response_start),
            ("Response End", self.response_end),
        ]
    }

    /// Seconds from fetch start to response end, when both are known.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.fetch_start, self.response_end) {
            (Some(start), Some(end)) => Some(seconds_between(start, end).max(0.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransferSize {
    pub request_header_bytes_sent: i64,
    pub request_body_bytes_before_encoding: i64,
    pub request_body_bytes_sent: i64,
    pub response_header_bytes_received: i64,
    pub response_body_bytes_after_decoding: i64,
    pub response_body_bytes_received: i64,
}

impl TransferSize {
    pub fn total_bytes_sent(&self) -> i64 {
        self.request_header_bytes_sent
            .wrapping_add(self.request_body_bytes_sent)
    }

    pub fn total_bytes_received(&self) -> i64 {
        self.response_header_bytes_received
            .wrapping_add(self.response_body_bytes_received)
    }

    pub fn merging(&self, other: &TransferSize) -> TransferSize {
        TransferSize {
            request_header_bytes_sent: self
                .request_header_bytes_sent
                .wrapping_add(other.request_header_bytes_sent),
            request_body_bytes_before_encoding: self
                .request_body_bytes_before_encoding
                .wrapping_add(other.request_body_bytes_before_encoding),
            request_body_bytes_sent: self
                .request_body_bytes_sent
                .wrapping_add(other.request_body_bytes_sent),
            response_header_bytes_received: self
                .response_header_bytes_received
                .wrapping_add(other.response_header_bytes_received),
            response_body_bytes_after_decoding: self
                .response_body_bytes_after_decoding
                .wrapping_add(other.response_body_bytes_after_decoding),
            response_body_bytes_received: self
                .response_body_bytes_received
                .wrapping_add(other.response_body_bytes_received),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Conditions {
    pub is_proxy_connection: bool,
    pub is_reused_connection: bool,
    pub is_cellular: bool,
    pub is_expensive: bool,
    pub is_constrained: bool,
    pub is_multipath: bool,
}

pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
