// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Transparent observation of a single exchange.
//!
//! The interceptor tags the request with an [`InterceptionToken`], publishes a
//! pending record, and wraps the inner transport's event stream. Every event
//! is mirrored into the record and forwarded to the caller unchanged, except
//! server-trust challenges, which are answered here.

use crate::cookie::format_cookie_string;
use crate::error::{ErrorKind, TransportError};
use crate::ledger::Ledger;
use crate::metrics::Metrics;
use crate::record::{Record, RecordId};
use crate::session::SessionConfig;
use crate::transport::{ChallengeDisposition, EventStream, Transport, TransportEvent};
use bytes::Bytes;
use futures_util::Stream;
use hyper::header::COOKIE;
use hyper::Request;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Body chunks arriving faster than this are folded into one ledger update.
const BODY_PUBLISH_INTERVAL: Duration = Duration::from_millis(100);

/// Marks a request as already observed, carrying the id of its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterceptionToken(pub RecordId);

#[derive(Debug, Clone)]
pub struct InterceptConfig {
    pub capture_request_bodies: bool,
    /// Off by default: cookie values are often session credentials.
    pub capture_cookies: bool,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            capture_request_bodies: true,
            capture_cookies: false,
        }
    }
}

#[derive(Debug)]
pub struct Interceptor {
    ledger: Arc<Ledger>,
    config: InterceptConfig,
}

impl Interceptor {
    pub fn new(ledger: Arc<Ledger>, config: InterceptConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// True when an interceptor has already claimed this request.
    pub fn is_intercepted<B>(request: &Request<B>) -> bool {
        request.extensions().get::<InterceptionToken>().is_some()
    }

    /// Observe `request` as it runs on `inner`. Requests that already carry a
    /// token pass through untouched.
    pub fn intercept(&self, mut request: Request<Bytes>, inner: &dyn Transport) -> EventStream {
        if Self::is_intercepted(&request) {
            trace!(uri = %request.uri(), "request already intercepted, passing through");
            return inner.open(request);
        }

        let id = RecordId::new();
        request.extensions_mut().insert(InterceptionToken(id));
        let record = self.build_record(id, &request);
        debug!(id = %id, method = %record.method, url = %record.url, "intercepted request");
        self.ledger.upsert(record.clone());

        Box::pin(RecordingStream {
            inner: inner.open(request),
            recorder: Recorder {
                ledger: Arc::clone(&self.ledger),
                record,
                started: Instant::now(),
                last_body_publish: None,
                metrics: None,
                finished: false,
            },
        })
    }

    fn build_record(&self, id: RecordId, request: &Request<Bytes>) -> Record {
        let mut record = Record::from_request(id, request, self.config.capture_request_bodies);
        let Some(session) = request.extensions().get::<Arc<SessionConfig>>() else {
            return record;
        };

        for (name, value) in &session.additional_headers {
            if *name == COOKIE {
                continue;
            }
            record
                .request_headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        if self.config.capture_cookies {
            if let Some(jar) = session.active_cookie_jar() {
                let cookies = jar.cookies_for(request.uri());
                if !cookies.is_empty() {
                    record.cookies = Some(format_cookie_string(&cookies));
                }
            }
        }
        record
    }
}

/// Transport decorator that intercepts everything sent through it.
pub struct InterceptingTransport {
    interceptor: Arc<Interceptor>,
    inner: Arc<dyn Transport>,
}

impl InterceptingTransport {
    pub fn new(interceptor: Arc<Interceptor>, inner: Arc<dyn Transport>) -> Self {
        Self { interceptor, inner }
    }
}

impl Transport for InterceptingTransport {
    fn open(&self, request: Request<Bytes>) -> EventStream {
        self.interceptor.intercept(request, self.inner.as_ref())
    }
}

/// Owns the evolving record of one exchange and publishes each transition.
struct Recorder {
    ledger: Arc<Ledger>,
    record: Record,
    started: Instant,
    last_body_publish: Option<Instant>,
    metrics: Option<Arc<Metrics>>,
    finished: bool,
}

impl Recorder {
    /// Never zero, even when the clock cannot resolve an in-process exchange.
    fn elapsed_ms(&self) -> f64 {
        (self.started.elapsed().as_secs_f64() * 1000.0).max(0.001)
    }

    fn observe(&mut self, event: &TransportEvent) {
        if self.finished {
            return;
        }
        match event {
            TransportEvent::Head(head) => {
                self.record.apply_response(head.status.as_u16(), &head.headers);
                trace!(id = %self.record.id, status = head.status.as_u16(), "response head");
                self.publish();
            }
            TransportEvent::Chunk(chunk) => {
                if self.record.append_body(chunk.clone()) && self.body_publish_due() {
                    self.last_body_publish = Some(Instant::now());
                    self.publish();
                }
            }
            TransportEvent::Redirected { status, location } => {
                trace!(id = %self.record.id, status = status.as_u16(), %location, "redirected");
            }
            TransportEvent::Metrics(metrics) => self.metrics = Some(Arc::clone(metrics)),
            TransportEvent::Challenge(_) => {}
        }
    }

    fn complete(&mut self) {
        if self.finished {
            return;
        }
        if self.record.status_code < 0 {
            self.fail(&TransportError::new(
                ErrorKind::BadServerResponse,
                "exchange ended without a response",
            ));
            return;
        }
        let elapsed = self.elapsed_ms();
        self.record.finish(elapsed, self.metrics.take());
        self.finished = true;
        debug!(id = %self.record.id, status = self.record.status_code, duration_ms = elapsed, "exchange completed");
        self.publish();
    }

    fn fail(&mut self, error: &TransportError) {
        if self.finished {
            return;
        }
        let elapsed = self.elapsed_ms();
        self.record.fail(error.clone(), elapsed);
        if let Some(metrics) = self.metrics.take() {
            self.record.metrics = Some(metrics);
        }
        self.finished = true;
        debug!(id = %self.record.id, error = %error, "exchange failed");
        self.publish();
    }

    fn body_publish_due(&self) -> bool {
        self.last_body_publish
            .map_or(true, |at| at.elapsed() >= BODY_PUBLISH_INTERVAL)
    }

    /// Updates only: a record evicted or deleted mid-flight stays gone.
    fn publish(&self) {
        self.ledger.update(self.record.clone());
    }
}

struct RecordingStream {
    inner: EventStream,
    recorder: Recorder,
}

impl Stream for RecordingStream {
    type Item = Result<TransportEvent, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.recorder.complete();
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.recorder.fail(&err);
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(Some(Ok(TransportEvent::Challenge(challenge))))
                    if challenge.is_server_trust() =>
                {
                    trace!(id = %this.recorder.record.id, "accepting server trust challenge");
                    challenge.respond(ChallengeDisposition::UseCredential);
                }
                Poll::Ready(Some(Ok(event))) => {
                    this.recorder.observe(&event);
                    return Poll::Ready(Some(Ok(event)));
                }
            }
        }
    }
}

impl Drop for RecordingStream {
    fn drop(&mut self) {
        if !self.recorder.finished {
            self.recorder.fail(&TransportError::cancelled());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordState;
    use crate::test_helpers::{make_get_request, ScriptStep, ScriptedTransport};
    use futures_util::StreamExt;
    use hyper::header::{HeaderName, HeaderValue};

    fn setup(config: InterceptConfig) -> (Arc<Ledger>, Interceptor) {
        let ledger = Arc::new(Ledger::default());
        let interceptor = Interceptor::new(Arc::clone(&ledger), config);
        (ledger, interceptor)
    }

    #[tokio::test]
    async fn round_trip_produces_success_record() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let transport = ScriptedTransport::new(vec![
            ScriptStep::Head(200, vec![("content-type", "application/json")]),
            ScriptStep::Chunk("{\"a\""),
            ScriptStep::Chunk(":1}"),
            ScriptStep::Metrics,
        ]);

        let mut stream = interceptor.intercept(make_get_request("http://a.test/x")?, transport.as_ref());
        let mut forwarded = Vec::new();
        while let Some(event) = stream.next().await {
            if let TransportEvent::Chunk(c) = event? {
                forwarded.extend_from_slice(&c);
            }
        }

        let snap = ledger.snapshot();
        assert_eq!(snap.len(), 1);
        let record = &snap[0];
        assert_eq!(record.state(), RecordState::Success);
        assert_eq!(record.status_code, 200);
        assert!(record.is_complete());
        assert!(record.duration_ms > 0.0);
        assert!(record.metrics.is_some());
        let body = record.response_body.as_ref().map(|b| b.to_bytes());
        assert_eq!(body.as_deref(), Some(forwarded.as_slice()));
        assert_eq!(forwarded, b"{\"a\":1}");
        Ok(())
    }

    #[tokio::test]
    async fn transport_error_is_recorded_and_forwarded() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let transport = ScriptedTransport::new(vec![ScriptStep::Fail(ErrorKind::TimedOut)]);

        let events: Vec<_> = interceptor
            .intercept(make_get_request("http://a.test/")?, transport.as_ref())
            .collect()
            .await;
        assert!(matches!(events.as_slice(), [Err(e)] if e.kind() == ErrorKind::TimedOut));

        let snap = ledger.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].state(), RecordState::Failure);
        assert_eq!(snap[0].error().map(|e| e.kind()), Some(ErrorKind::TimedOut));
        assert!(snap[0].duration_ms > 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn error_after_head_keeps_failure() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let transport = ScriptedTransport::new(vec![
            ScriptStep::Head(200, vec![]),
            ScriptStep::Chunk("part"),
            ScriptStep::Fail(ErrorKind::NetworkConnectionLost),
        ]);
        let _: Vec<_> = interceptor
            .intercept(make_get_request("http://a.test/")?, transport.as_ref())
            .collect()
            .await;

        let record = ledger.snapshot().newest().cloned().ok_or_else(|| anyhow::anyhow!("empty"))?;
        assert_eq!(record.state(), RecordState::Failure);
        assert_eq!(record.status_code, 200);
        Ok(())
    }

    #[tokio::test]
    async fn dropping_stream_cancels_record() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let transport = ScriptedTransport::new(vec![ScriptStep::Head(200, vec![]), ScriptStep::Hang]);

        let mut stream = interceptor.intercept(make_get_request("http://a.test/")?, transport.as_ref());
        let first = stream.next().await;
        assert!(matches!(first, Some(Ok(TransportEvent::Head(_)))));
        assert_eq!(ledger.snapshot()[0].state(), RecordState::Success);
        assert!(!ledger.snapshot()[0].is_complete());
        drop(stream);

        let snap = ledger.snapshot();
        let record = &snap[0];
        assert_eq!(record.state(), RecordState::Failure);
        assert_eq!(record.error().map(|e| e.kind()), Some(ErrorKind::Cancelled));
        assert!(record.is_complete());
        Ok(())
    }

    #[tokio::test]
    async fn server_trust_is_answered_internally() -> anyhow::Result<()> {
        let (_ledger, interceptor) = setup(InterceptConfig::default());
        let transport = ScriptedTransport::new(vec![
            ScriptStep::TrustChallenge,
            ScriptStep::AuthChallenge,
            ScriptStep::Head(204, vec![]),
        ]);

        let events: Vec<_> = interceptor
            .intercept(make_get_request("https://a.test/")?, transport.as_ref())
            .collect()
            .await;
        // trust challenge is consumed, auth challenge reaches the caller
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(TransportEvent::Challenge(c)) if !c.is_server_trust()));
        assert_eq!(
            transport.challenge_replies(),
            vec![Some(ChallengeDisposition::UseCredential), None]
        );
        Ok(())
    }

    #[tokio::test]
    async fn nested_interception_passes_through() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let interceptor = Arc::new(interceptor);
        let scripted = ScriptedTransport::ok(200, "x");
        let inner: Arc<dyn Transport> = Arc::new(InterceptingTransport::new(
            Arc::clone(&interceptor),
            scripted.clone(),
        ));

        let _: Vec<_> = interceptor
            .intercept(make_get_request("http://a.test/")?, inner.as_ref())
            .collect()
            .await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(scripted.tokens_seen(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn session_headers_merge_without_cookie() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let mut req = make_get_request("http://a.test/")?;
        let cfg = SessionConfig::default()
            .header(HeaderName::from_static("x-app"), HeaderValue::from_static("demo"))
            .header(COOKIE, HeaderValue::from_static("sid=1"));
        req.extensions_mut().insert(Arc::new(cfg));

        let _: Vec<_> = interceptor
            .intercept(req, ScriptedTransport::ok(200, "").as_ref())
            .collect()
            .await;
        let snap = ledger.snapshot();
        let record = &snap[0];
        assert_eq!(record.request_headers.get("x-app").map(String::as_str), Some("demo"));
        assert!(!record.request_headers.contains_key("cookie"));
        assert!(record.cookies.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn cookie_capture_is_opt_in() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig {
            capture_cookies: true,
            ..InterceptConfig::default()
        });
        let jar = Arc::new(crate::cookie::CookieJar::new());
        jar.insert("a.test", "sid", "1");
        let mut req = make_get_request("http://a.test/")?;
        req.extensions_mut().insert(Arc::new(SessionConfig::default().cookie_jar(jar)));

        let _: Vec<_> = interceptor
            .intercept(req, ScriptedTransport::ok(200, "").as_ref())
            .collect()
            .await;
        assert_eq!(ledger.snapshot()[0].cookies.as_deref(), Some("sid=1;"));
        Ok(())
    }

    #[tokio::test]
    async fn chunk_bursts_are_coalesced() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let mut steps = vec![ScriptStep::Head(200, vec![])];
        steps.extend((0..50).map(|_| ScriptStep::Chunk("x")));
        let transport = ScriptedTransport::new(steps);
        let mut rx = ledger.subscribe();

        let _: Vec<_> = interceptor
            .intercept(make_get_request("http://a.test/")?, transport.as_ref())
            .collect()
            .await;

        let mut changes = 0;
        while rx.try_recv().is_ok() {
            changes += 1;
        }
        // insert, head, first chunk, completion
        assert!(changes <= 5, "{changes} notifications for 50 chunks");
        let snap = ledger.snapshot();
        assert_eq!(snap[0].response_body.as_ref().map(|b| b.len()), Some(50));
        assert!(snap[0].is_complete());
        Ok(())
    }

    #[tokio::test]
    async fn evicted_request_is_not_reinserted() -> anyhow::Result<()> {
        let ledger = Arc::new(Ledger::new(1, 8));
        let interceptor = Interceptor::new(Arc::clone(&ledger), InterceptConfig::default());
        let hook_fires = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fires = Arc::clone(&hook_fires);
        ledger.set_new_record_hook(Some(Arc::new(move |_: &Record| {
            fires.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })));

        let transport = ScriptedTransport::ok(200, "late");
        let stream = interceptor.intercept(make_get_request("http://a.test/")?, transport.as_ref());
        ledger.upsert(Record::from_entry(&crate::record::CustomEntry::new(
            crate::record::LogLevel::Debug,
            "App",
            "newer",
        )));
        let _: Vec<_> = stream.collect().await;

        let snap = ledger.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].is_log());
        assert_eq!(hook_fires.load(std::sync::atomic::Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_head_is_bad_response() -> anyhow::Result<()> {
        let (ledger, interceptor) = setup(InterceptConfig::default());
        let _: Vec<_> = interceptor
            .intercept(make_get_request("http://a.test/")?, ScriptedTransport::new(vec![]).as_ref())
            .collect()
            .await;
        let snap = ledger.snapshot();
        let record = &snap[0];
        assert_eq!(record.error().map(|e| e.kind()), Some(ErrorKind::BadServerResponse));
        Ok(())
    }
}
