// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Network transport backed by the hyper client with rustls.
//!
//! Each exchange runs on its own task and reports through a bounded channel,
//! so a slow consumer applies backpressure to body reads. When the consumer
//! drops the stream the task notices the closed channel and aborts the
//! in-flight request.

use super::{
    protocol_name, Challenge, ChallengeDisposition, ChallengeKind, EventStream, ResponseHead,
    Transport, TransportEvent,
};
use crate::error::{ErrorKind, TransportError};
use crate::helpers::headers::{get_header_str, header_block_len};
use crate::helpers::status::{is_redirection_status, redirect_rewrites_to_get};
use crate::metrics::{
    Conditions, FetchType, Metrics, TaskInterval, TransactionMetrics, TransactionTiming,
    TransferSize,
};
use crate::session::{RedirectPolicy, SessionConfig};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, WWW_AUTHENTICATE};
use hyper::{HeaderMap, Method, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{HttpConnector, HttpInfo};
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

type HttpsClient = LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>;
type EventSender = mpsc::Sender<Result<TransportEvent, TransportError>>;

const EVENT_BUFFER: usize = 16;

#[derive(Clone)]
pub struct HyperTransport {
    client: HttpsClient,
}

impl HyperTransport {
    /// Build a client trusting the platform's native roots. Without any
    /// native roots, plain HTTP still works and every TLS peer is untrusted.
    pub fn new() -> anyhow::Result<Self> {
        let builder = match HttpsConnectorBuilder::new().with_native_roots() {
            Ok(builder) => builder,
            Err(e) => {
                tracing::warn!(error = %e, "no native root certificates available");
                let tls = rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth();
                HttpsConnectorBuilder::new().with_tls_config(tls)
            }
        };
        let https = builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = LegacyClient::builder(TokioExecutor::new()).build(https);
        Ok(Self { client })
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl Transport for HyperTransport {
    fn open(&self, request: Request<Bytes>) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let client = self.client.clone();
        tokio::spawn(async move {
            let watcher = tx.clone();
            tokio::select! {
                _ = watcher.closed() => {
                    trace!("event stream dropped, abandoning exchange");
                }
                _ = run_exchange(client, request, tx) => {}
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }
}

async fn run_exchange(client: HttpsClient, request: Request<Bytes>, tx: EventSender) {
    let session = request
        .extensions()
        .get::<Arc<SessionConfig>>()
        .cloned()
        .unwrap_or_default();

    let exchange = drive(&client, request, &session, &tx);
    let result = match session.timeout {
        Some(limit) => match tokio::time::timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timed_out()),
        },
        None => exchange.await,
    };

    if let Err(err) = result {
        debug!(error = %err, "exchange failed");
        // Receiver may already be gone.
        let _ = tx.send(Err(err)).await;
    }
}

async fn emit(tx: &EventSender, event: TransportEvent) -> Result<(), TransportError> {
    tx.send(Ok(event))
        .await
        .map_err(|_| TransportError::cancelled())
}

/// One request attempt, before the response is known.
struct Attempt {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Attempt {
    fn to_request(&self) -> Request<Full<Bytes>> {
        let mut req = Request::new(Full::new(self.body.clone()));
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers.clone();
        req
    }

    fn transaction(
        &self,
        status: u16,
        protocol: &str,
        timing: TransactionTiming,
        transfer_size: TransferSize,
        info: Option<&HttpInfo>,
    ) -> TransactionMetrics {
        TransactionMetrics {
            method: self.method.as_str().to_string(),
            url: self.uri.to_string(),
            status_code: Some(status),
            fetch_type: FetchType::NetworkLoad,
            network_protocol: Some(protocol.to_string()),
            timing,
            transfer_size,
            conditions: Conditions::default(),
            local_address: info.map(|i| i.local_addr().ip().to_string()),
            local_port: info.map(|i| i.local_addr().port()),
            remote_address: info.map(|i| i.remote_addr().ip().to_string()),
            remote_port: info.map(|i| i.remote_addr().port()),
        }
    }
}

async fn drive(
    client: &HttpsClient,
    request: Request<Bytes>,
    session: &SessionConfig,
    tx: &EventSender,
) -> Result<(), TransportError> {
    let task_start = Utc::now();
    let (parts, body) = request.into_parts();
    let mut headers = parts.headers;
    for (name, value) in &session.additional_headers {
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    let mut attempt = Attempt {
        method: parts.method,
        uri: parts.uri,
        headers,
        body,
    };

    let mut transactions = Vec::new();
    let mut redirect_count = 0u32;

    loop {
        if let Some(jar) = session.active_cookie_jar() {
            attempt.headers.remove(COOKIE);
            if let Some(cookie) = jar.header_value(&attempt.uri) {
                if let Ok(value) = cookie.parse() {
                    attempt.headers.insert(COOKIE, value);
                }
            }
        }

        let mut timing = TransactionTiming {
            fetch_start: Some(Utc::now()),
            ..TransactionTiming::default()
        };
        let request_header_bytes = header_block_len(&attempt.headers);
        trace!(method = %attempt.method, uri = %attempt.uri, "sending request");
        timing.request_start = Some(Utc::now());
        let response = client
            .request(attempt.to_request())
            .await
            .map_err(|e| TransportError::from_client_error(&e))?;
        timing.request_end = Some(Utc::now());
        timing.response_start = timing.request_end;

        let status = response.status();
        let version = response.version();
        let response_headers = response.headers().clone();
        let info = response.extensions().get::<HttpInfo>().cloned();

        if let Some(jar) = session.active_cookie_jar() {
            jar.store_response_cookies(&attempt.uri, &response_headers);
        }

        let mut transfer = TransferSize {
            request_header_bytes_sent: request_header_bytes,
            request_body_bytes_before_encoding: attempt.body.len() as i64,
            request_body_bytes_sent: attempt.body.len() as i64,
            response_header_bytes_received: header_block_len(&response_headers),
            ..TransferSize::default()
        };

        let location = get_header_str(&response_headers, LOCATION.as_str()).map(str::to_string);
        if let (RedirectPolicy::Follow { max }, true, Some(location)) = (
            session.redirect_policy,
            is_redirection_status(status.as_u16()),
            location,
        ) {
            if redirect_count >= max {
                return Err(TransportError::new(
                    ErrorKind::TooManyRedirects,
                    format!("stopped after {max} redirects"),
                ));
            }
            let next = resolve_location(&attempt.uri, &location)?;
            timing.response_end = Some(Utc::now());
            transactions.push(attempt.transaction(
                status.as_u16(),
                protocol_name(version),
                timing,
                transfer,
                info.as_ref(),
            ));
            debug!(from = %attempt.uri, to = %next, status = status.as_u16(), "following redirect");
            emit(
                tx,
                TransportEvent::Redirected {
                    status,
                    location: next.to_string(),
                },
            )
            .await?;

            if redirect_rewrites_to_get(status, &attempt.method) {
                attempt.method = Method::GET;
                attempt.body = Bytes::new();
                attempt.headers.remove(CONTENT_TYPE);
                attempt.headers.remove(CONTENT_LENGTH);
            }
            attempt.uri = next;
            redirect_count += 1;
            continue;
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(kind) = get_header_str(&response_headers, WWW_AUTHENTICATE.as_str())
                .and_then(parse_auth_challenge)
            {
                let (challenge, reply) = Challenge::new(kind);
                emit(tx, TransportEvent::Challenge(challenge)).await?;
                // A dropped challenge means default handling.
                if let Ok(ChallengeDisposition::Cancel) = reply.await {
                    debug!(uri = %attempt.uri, "auth challenge cancelled");
                    return Err(TransportError::cancelled());
                }
            }
        }

        emit(
            tx,
            TransportEvent::Head(ResponseHead {
                status,
                version,
                headers: response_headers,
            }),
        )
        .await?;

        let mut incoming = response.into_body();
        let mut received = 0i64;
        while let Some(frame) = incoming.frame().await {
            let frame = frame.map_err(|e| TransportError::from_body_error(&e))?;
            if let Ok(data) = frame.into_data() {
                received += data.len() as i64;
                emit(tx, TransportEvent::Chunk(data)).await?;
            }
        }
        timing.response_end = Some(Utc::now());
        transfer.response_body_bytes_received = received;
        transfer.response_body_bytes_after_decoding = received;
        transactions.push(attempt.transaction(
            status.as_u16(),
            protocol_name(version),
            timing,
            transfer,
            info.as_ref(),
        ));
        break;
    }

    let metrics = Metrics {
        task_interval: TaskInterval {
            start: task_start,
            end: Utc::now(),
        },
        redirect_count,
        transactions,
    };
    emit(tx, TransportEvent::Metrics(Arc::new(metrics))).await
}

/// `Basic realm="api"` into an HTTP auth challenge. Only the first
/// challenge of the header is considered.
fn parse_auth_challenge(value: &str) -> Option<ChallengeKind> {
    let value = value.trim();
    let (scheme, params) = value.split_once(' ').unwrap_or((value, ""));
    if scheme.is_empty() {
        return None;
    }
    let realm = params.split(',').find_map(|param| {
        let (name, v) = param.trim().split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("realm")
            .then(|| v.trim().trim_matches('"').to_string())
    });
    Some(ChallengeKind::HttpAuth {
        scheme: scheme.to_string(),
        realm,
    })
}

fn resolve_location(base: &Uri, location: &str) -> Result<Uri, TransportError> {
    let invalid = |detail: String| {
        TransportError::new(ErrorKind::RedirectToNonExistentLocation, detail)
    };
    let base = url::Url::parse(&base.to_string()).map_err(|e| invalid(e.to_string()))?;
    let joined = base.join(location).map_err(|e| invalid(e.to_string()))?;
    joined
        .as_str()
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))
}
