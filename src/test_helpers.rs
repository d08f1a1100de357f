// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared test utilities to reduce duplication across test modules.

use crate::error::{ErrorKind, TransportError};
use crate::intercept::InterceptionToken;
use crate::metrics::{
    Conditions, FetchType, Metrics, TaskInterval, TransactionMetrics, TransactionTiming,
    TransferSize,
};
use crate::record::{Record, RecordId};
use crate::transport::{
    Challenge, ChallengeDisposition, ChallengeKind, EventStream, ResponseHead, Transport,
    TransportEvent,
};
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures_util::stream::{self, StreamExt};
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Request, StatusCode, Version};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Build a bodyless GET request for `url`.
pub fn make_get_request(url: &str) -> anyhow::Result<Request<Bytes>> {
    Ok(Request::builder().method("GET").uri(url).body(Bytes::new())?)
}

/// Create a HeaderMap from name/value pairs; repeated names are appended.
pub fn make_headers_from_pairs(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (k, v) in pairs {
        headers.append(
            HeaderName::from_bytes(k.as_bytes()).expect("valid test header name"),
            HeaderValue::from_str(v).expect("valid test header value"),
        );
    }
    headers
}

/// A pending record for a GET of `url`.
pub fn make_test_record(url: &str) -> anyhow::Result<Record> {
    Ok(Record::from_request(RecordId::new(), &make_get_request(url)?, true))
}

/// A completed record that received `status`.
pub fn make_test_record_with_status(url: &str, status: u16) -> anyhow::Result<Record> {
    make_test_record_with_response(url, status, &[])
}

/// A completed record that received `status` with the given response headers.
pub fn make_test_record_with_response(
    url: &str,
    status: u16,
    headers: &[(&str, &str)],
) -> anyhow::Result<Record> {
    let mut record = make_test_record(url)?;
    record.apply_response(status, &make_headers_from_pairs(headers));
    record.finish(12.0, None);
    Ok(record)
}

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms)
        .single()
        .unwrap_or_default()
}

/// Metrics with `transactions` identical h2 transactions: fetch start at 0,
/// request start at +5 ms, response end at +25 ms.
pub fn make_test_metrics(transactions: usize) -> Metrics {
    let transaction = TransactionMetrics {
        method: "GET".into(),
        url: "https://a.test/".into(),
        status_code: Some(200),
        fetch_type: FetchType::NetworkLoad,
        network_protocol: Some("h2".into()),
        timing: TransactionTiming {
            fetch_start: Some(at(0)),
            request_start: Some(at(5)),
            response_end: Some(at(25)),
            ..TransactionTiming::default()
        },
        transfer_size: TransferSize {
            request_header_bytes_sent: 120,
            response_header_bytes_received: 300,
            response_body_bytes_received: 1_500_000,
            response_body_bytes_after_decoding: 1_500_000,
            ..TransferSize::default()
        },
        conditions: Conditions {
            is_reused_connection: true,
            ..Conditions::default()
        },
        local_address: Some("127.0.0.1".into()),
        local_port: Some(0),
        remote_address: Some("192.0.2.10".into()),
        remote_port: Some(443),
    };
    Metrics {
        task_interval: TaskInterval {
            start: at(0),
            end: at(0) + Duration::milliseconds(25),
        },
        redirect_count: 0,
        transactions: vec![transaction; transactions],
    }
}

/// One scripted transport event.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Head(u16, Vec<(&'static str, &'static str)>),
    Chunk(&'static str),
    Metrics,
    TrustChallenge,
    AuthChallenge,
    /// Terminal failure; nothing after it is sent.
    Fail(ErrorKind),
    /// Never make progress again.
    Hang,
}

/// In-memory transport replaying the same script for every request.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Vec<ScriptStep>,
    opened: AtomicUsize,
    tokens_seen: AtomicUsize,
    replies: Mutex<Vec<oneshot::Receiver<ChallengeDisposition>>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<ScriptStep>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            ..Self::default()
        })
    }

    /// Responds with `status` and a single body chunk.
    pub fn ok(status: u16, body: &'static str) -> Arc<Self> {
        Self::new(vec![ScriptStep::Head(status, vec![]), ScriptStep::Chunk(body)])
    }

    /// Number of exchanges opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of opened requests that already carried an interception token.
    pub fn tokens_seen(&self) -> usize {
        self.tokens_seen.load(Ordering::SeqCst)
    }

    /// Reply received so far for each challenge sent, in order.
    pub fn challenge_replies(&self) -> Vec<Option<ChallengeDisposition>> {
        let mut replies = self.replies.lock().expect("replies lock");
        replies.iter_mut().map(|rx| rx.try_recv().ok()).collect()
    }

    fn challenge(&self, kind: ChallengeKind) -> TransportEvent {
        let (challenge, rx) = Challenge::new(kind);
        self.replies.lock().expect("replies lock").push(rx);
        TransportEvent::Challenge(challenge)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, request: Request<Bytes>) -> EventStream {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if request.extensions().get::<InterceptionToken>().is_some() {
            self.tokens_seen.fetch_add(1, Ordering::SeqCst);
        }
        let host = request.uri().host().unwrap_or_default().to_string();

        let mut events: Vec<Result<TransportEvent, TransportError>> = Vec::new();
        let mut hang = false;
        for step in &self.steps {
            match step {
                ScriptStep::Head(status, headers) => {
                    events.push(Ok(TransportEvent::Head(ResponseHead {
                        status: StatusCode::from_u16(*status).expect("valid test status"),
                        version: Version::HTTP_11,
                        headers: make_headers_from_pairs(headers),
                    })))
                }
                ScriptStep::Chunk(text) => {
                    events.push(Ok(TransportEvent::Chunk(Bytes::from_static(text.as_bytes()))))
                }
                ScriptStep::Metrics => {
                    events.push(Ok(TransportEvent::Metrics(Arc::new(make_test_metrics(1)))))
                }
                ScriptStep::TrustChallenge => events.push(Ok(self.challenge(
                    ChallengeKind::ServerTrust { host: host.clone() },
                ))),
                ScriptStep::AuthChallenge => events.push(Ok(self.challenge(ChallengeKind::HttpAuth {
                    scheme: "Basic".into(),
                    realm: Some("test".into()),
                }))),
                ScriptStep::Fail(kind) => {
                    events.push(Err(TransportError::new(*kind, "scripted failure")));
                    break;
                }
                ScriptStep::Hang => {
                    hang = true;
                    break;
                }
            }
        }

        let replay = stream::iter(events);
        if hang {
            replay.chain(stream::pending()).boxed()
        } else {
            replay.boxed()
        }
    }
}
