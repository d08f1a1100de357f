// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use super::render_pairs;
use crate::format::{format_bytes, format_duration, status_code_string};
use crate::metrics::{seconds_between, Metrics, TransactionMetrics};

/// Per-transaction detail: overview, data transfer, protocol, timings and
/// connection conditions. Transactions are separated by a blank line.
pub fn to_metrics_text(metrics: &Metrics) -> String {
    metrics
        .transactions
        .iter()
        .map(transaction_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn transaction_text(t: &TransactionMetrics) -> String {
    [
        section("Overview", overview(t)),
        section("Data Transfer", transfer(t)),
        section("Protocol", protocol(t)),
        section("Timings", timings(t)),
        section("Conditions", conditions(t)),
    ]
    .join("\n")
}

fn section(title: &str, body: String) -> String {
    format!("{title}\n{body}")
}

fn overview(t: &TransactionMetrics) -> String {
    let mut pairs = vec![("URL", t.url.clone())];
    if let Some(code) = t.status_code {
        pairs.push(("Response code", status_code_string(i32::from(code))));
    }
    pairs.push(("Method", t.method.clone()));
    render_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
}

fn transfer(t: &TransactionMetrics) -> String {
    let s = &t.transfer_size;
    let request = [
        ("Request Headers", format_bytes(s.request_header_bytes_sent)),
        ("Request Body", format_bytes(s.request_body_bytes_sent)),
        ("Request Body (Encoded)", format_bytes(s.request_body_bytes_before_encoding)),
    ];
    let response = [
        ("Response Headers", format_bytes(s.response_header_bytes_received)),
        ("Response Body", format_bytes(s.response_body_bytes_received)),
        ("Response Body (Decoded)", format_bytes(s.response_body_bytes_after_decoding)),
    ];
    let mut out = render_pairs([("Fetch Type", t.fetch_type.title())]);
    out.push('\n');
    out.push_str(&render_pairs(request.iter().map(|(k, v)| (*k, v.as_str()))));
    out.push('\n');
    out.push_str(&render_pairs(response.iter().map(|(k, v)| (*k, v.as_str()))));
    out
}

fn protocol(t: &TransactionMetrics) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("Network Protocol", t.network_protocol.clone().unwrap_or_default()),
        ("Remote Address", t.remote_address.clone().unwrap_or_default()),
    ];
    if let Some(port) = t.remote_port.filter(|p| *p > 0) {
        pairs.push(("Remote Port", port.to_string()));
    }
    pairs.push(("Local Address", t.local_address.clone().unwrap_or_default()));
    if let Some(port) = t.local_port.filter(|p| *p > 0) {
        pairs.push(("Local Port", port.to_string()));
    }
    render_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
}

/// Known phases only; each after the first shows its offset from the first.
fn timings(t: &TransactionMetrics) -> String {
    let mut start = None;
    let mut pairs: Vec<(&str, String)> = Vec::new();
    for (title, date) in t.timing.phases() {
        let Some(date) = date else {
            continue;
        };
        let first = *start.get_or_insert(date);
        let mut value = date.format("%H:%M:%S%.3f").to_string();
        if date != first {
            value.push_str(&format!(
                " (+{})",
                format_duration(seconds_between(first, date), true)
            ));
        }
        pairs.push((title, value));
    }
    render_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
}

fn conditions(t: &TransactionMetrics) -> String {
    let c = &t.conditions;
    let flags = [
        ("Cellular", c.is_cellular),
        ("Expensive", c.is_expensive),
        ("Constrained", c.is_constrained),
        ("Proxy Connection", c.is_proxy_connection),
        ("Reused Connection", c.is_reused_connection),
        ("Multipath", c.is_multipath),
    ];
    render_pairs(flags.iter().map(|(k, v)| (*k, if *v { "true" } else { "false" })))
}
