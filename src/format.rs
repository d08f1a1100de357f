// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Human readable status, duration and size strings.

use crate::record::{Record, RecordState};
use hyper::StatusCode;

/// Title shown while an exchange is still in flight.
pub const IN_PROGRESS: &str = "IN PROGRESS";

/// Status line for a record: in-progress marker, status text, or the short
/// failure reason when an error is known.
pub fn status_title(record: &Record) -> String {
    match record.state() {
        RecordState::Pending => IN_PROGRESS.to_string(),
        RecordState::Success => status_code_string(record.status_code),
        RecordState::Failure => match record.error() {
            Some(err) => err.kind().short_description().to_string(),
            None => status_code_string(record.status_code),
        },
    }
}

/// `"<code> <Reason>"` with a handful of friendlier spellings.
pub fn status_code_string(code: i32) -> String {
    match code {
        0 => "Success".to_string(),
        200 => "200 OK".to_string(),
        418 => "418 Teapot".to_string(),
        429 => "429 Too many requests".to_string(),
        451 => "451 Unavailable for Legal Reasons".to_string(),
        _ => match reason_phrase(code) {
            Some(reason) => format!("{code} {}", capitalize_words(&reason)),
            None => code.to_string(),
        },
    }
}

fn reason_phrase(code: i32) -> Option<String> {
    let code = u16::try_from(code).ok()?;
    let status = StatusCode::from_u16(code).ok()?;
    if let Some(reason) = status.canonical_reason() {
        return Some(reason.to_string());
    }
    let class = if status.is_informational() {
        "informational"
    } else if status.is_success() {
        "success"
    } else if status.is_redirection() {
        "redirected"
    } else if status.is_client_error() {
        "client error"
    } else {
        "server error"
    };
    Some(class.to_string())
}

fn capitalize_words(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Format an interval in seconds. Precise output keeps more decimals.
pub fn format_duration(seconds: f64, precise: bool) -> String {
    if !seconds.is_finite() {
        return "-".to_string();
    }
    if seconds < 0.95 {
        return if precise {
            format!("{:.1} ms", seconds * 1000.0)
        } else {
            format!("{:.0} ms", seconds * 1000.0)
        };
    }
    if seconds < 200.0 {
        return if precise {
            format!("{seconds:.3} s")
        } else {
            format!("{seconds:.1} s")
        };
    }
    let minutes = seconds / 60.0;
    if minutes < 60.0 {
        return format!("{minutes:.1} min");
    }
    format!("{:.1} h", seconds / 3600.0)
}

/// Format a duration held in milliseconds, as stored on records.
pub fn format_millis(millis: f64) -> String {
    format_duration(millis / 1000.0, false)
}

/// Decimal byte count: `512 B`, `2 KB`, `1.5 MB`.
pub fn format_bytes(count: i64) -> String {
    if count < 1000 {
        return format!("{count} B");
    }
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];
    let mut number = count as f64;
    let mut exp = 0usize;
    while number >= 1000.0 && exp < UNITS.len() {
        number /= 1000.0;
        exp += 1;
    }
    let unit = UNITS[exp - 1];
    if exp <= 1 || number >= 100.0 {
        format!("{number:.0} {unit}")
    } else {
        let text = format!("{number:.1}");
        let text = text.strip_suffix(".0").unwrap_or(&text);
        format!("{text} {unit}")
    }
}
