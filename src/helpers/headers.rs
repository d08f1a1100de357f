// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use crate::record::Headers;
use hyper::HeaderMap;

/// Retrieve a header value as a string, if it exists and contains only visible ASCII.
pub fn get_header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Flatten a `HeaderMap` into a string map.
///
/// Repeated fields are joined with ", ". Values that are not valid UTF-8 are
/// decoded lossily rather than dropped.
pub fn headers_to_map(headers: &HeaderMap) -> Headers {
    let mut map = Headers::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}

/// Case-insensitive lookup in a flattened header map.
pub fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Approximate size of the header block on the wire: `name: value\r\n` per field.
pub fn header_block_len(headers: &HeaderMap) -> i64 {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().len() + value.len() + 4) as i64)
        .sum()
}

/// Split a media type into its primary part and parameters.
///
/// Unlike a strict media-type parser, values without a `/` are accepted so
/// that loose server labels such as `json` still classify.
pub fn split_media_type(val: &str) -> (&str, Option<&str>) {
    let mut parts = val.splitn(2, ';');
    let media = parts.next().unwrap_or("").trim();
    let params = parts.next().map(str::trim).filter(|p| !p.is_empty());
    (media, params)
}
