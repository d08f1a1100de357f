// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use crate::record::Record;

const SEPARATOR: &str = " \\\n\t";

/// A `curl` invocation reproducing the request, one argument per continued
/// line. `None` for records without a host and for log records.
pub fn to_shell_command(record: &Record) -> Option<String> {
    record.host.as_ref()?;
    if record.is_log() {
        return None;
    }

    let mut parts = vec!["curl -v".to_string()];
    if record.method != "GET" {
        parts.push(format!("-X {}", record.method));
    }
    for (name, value) in &record.request_headers {
        parts.push(format!("-H \"{}: {}\"", name, value.replace('"', "\\\"")));
    }
    if let Some(body) = record
        .request_body
        .as_ref()
        .and_then(|b| std::str::from_utf8(b).ok())
    {
        let escaped = body.replace("\\\"", "\\\\\"").replace('"', "\\\"");
        parts.push(format!("-d \"{escaped}\""));
    }
    parts.push(format!("\"{}\"", record.url));
    Some(parts.join(SEPARATOR))
}
