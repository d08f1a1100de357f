// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use hyper::{HeaderMap, Request, StatusCode, Version};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use net_monitor::config::Config;
use net_monitor::error::TransportError;
use net_monitor::registry::Registry;
use net_monitor::session::{Session, SessionConfig};
use net_monitor::transport::{EventStream, HyperTransport, ResponseHead, Transport, TransportEvent};
use net_monitor::Monitor;

/// Monitor on its own registry so tests can run in parallel.
pub fn isolated_monitor() -> Monitor {
    Monitor::with_registry(&Config::default(), Registry::new())
}

/// A real-network session that `monitor` observes.
pub fn intercepted_session(monitor: &Monitor, config: SessionConfig) -> anyhow::Result<Session> {
    monitor.start_intercepting();
    let transport = Arc::new(HyperTransport::new()?);
    Ok(monitor.session(transport).config(config).build())
}

pub fn get(url: &str) -> anyhow::Result<Request<Bytes>> {
    Ok(Request::get(url).body(Bytes::new())?)
}

pub fn post(url: &str, content_type: &str, body: &'static str) -> anyhow::Result<Request<Bytes>> {
    Ok(Request::post(url)
        .header("content-type", content_type)
        .body(Bytes::from_static(body.as_bytes()))?)
}

/// Server with a handful of canned endpoints:
/// `/json` (200, `{"a":1}`), `/missing` (404), `/slow` (200 after 2s).
pub async fn start_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"a":1}"#, "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_raw(r#"{"id":7,"tags":["x"]}"#, "application/json"),
        )
        .mount(&server)
        .await;
    server
}

/// In-memory transport answering every request with the status mapped from
/// the last path segment (`/404` answers 404) and the path as body.
#[derive(Debug, Default)]
pub struct EchoStatusTransport;

impl Transport for EchoStatusTransport {
    fn open(&self, request: Request<Bytes>) -> EventStream {
        let path = request.uri().path().to_string();
        let status = path
            .rsplit('/')
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::OK);
        let events: Vec<Result<TransportEvent, TransportError>> = vec![
            Ok(TransportEvent::Head(ResponseHead {
                status,
                version: Version::HTTP_11,
                headers: HeaderMap::new(),
            })),
            Ok(TransportEvent::Chunk(Bytes::from(path))),
        ];
        stream::iter(events).boxed()
    }
}

/// A session over [`EchoStatusTransport`] that `monitor` observes.
pub fn echo_session(monitor: &Monitor) -> Session {
    monitor.start_intercepting();
    monitor.session(Arc::new(EchoStatusTransport)).build()
}
