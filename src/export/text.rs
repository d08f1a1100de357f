// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use super::{overview, render_headers};
use crate::body::render_section;
use crate::record::{ChunkedBody, Record};

/// Plain-text report with fixed section order: Overview, Cookies (only when
/// captured), Request Headers, Request Body, Response Headers, Response Body.
pub fn to_text(record: &Record) -> String {
    let mut sections: Vec<(&str, String)> = vec![("Overview", overview(record))];
    if let Some(cookies) = &record.cookies {
        sections.push(("Cookies", format!("{cookies}\n")));
    }
    sections.push(("Request Headers", render_headers(&record.request_headers)));
    sections.push((
        "Request Body",
        line(render_section(
            record.request_body.as_deref(),
            record.request_content_type().as_ref(),
        )),
    ));
    sections.push(("Response Headers", render_headers(&record.response_headers)));
    let response_body = record.response_body.as_ref().map(ChunkedBody::to_bytes);
    sections.push((
        "Response Body",
        line(render_section(
            response_body.as_deref(),
            record.response_content_type().as_ref(),
        )),
    ));

    sections
        .into_iter()
        .map(|(title, content)| format!("{title}\n{content}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn line(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}
