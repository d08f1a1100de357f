// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! The transport abstraction every exchange flows through.
//!
//! A transport turns a request into a stream of events. The stream ending
//! normally means the exchange succeeded; an `Err` item is the terminal
//! failure. Dropping the stream cancels the exchange.

pub mod client;

use crate::error::TransportError;
use crate::metrics::Metrics;
use bytes::Bytes;
use futures_util::Stream;
use hyper::{HeaderMap, Request, StatusCode, Version};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

pub use client::HyperTransport;

pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<TransportEvent, TransportError>> + Send>>;

pub trait Transport: Send + Sync + 'static {
    fn open(&self, request: Request<Bytes>) -> EventStream;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open(&self, request: Request<Bytes>) -> EventStream {
        (**self).open(request)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
}

#[derive(Debug)]
pub enum TransportEvent {
    /// A redirect is being followed; the next `Head` belongs to `location`.
    Redirected { status: StatusCode, location: String },
    Challenge(Challenge),
    Head(ResponseHead),
    Chunk(Bytes),
    /// Emitted once, just before a successful end of stream.
    Metrics(Arc<Metrics>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    ServerTrust { host: String },
    HttpAuth { scheme: String, realm: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDisposition {
    UseCredential,
    PerformDefaultHandling,
    Cancel,
}

/// An authentication challenge awaiting a disposition. Dropping it without
/// responding means default handling.
#[derive(Debug)]
pub struct Challenge {
    pub kind: ChallengeKind,
    reply: Option<oneshot::Sender<ChallengeDisposition>>,
}

impl Challenge {
    pub fn new(kind: ChallengeKind) -> (Self, oneshot::Receiver<ChallengeDisposition>) {
        let (tx, rx) = oneshot::channel();
        (Self { kind, reply: Some(tx) }, rx)
    }

    pub fn is_server_trust(&self) -> bool {
        matches!(self.kind, ChallengeKind::ServerTrust { .. })
    }

    pub fn respond(mut self, disposition: ChallengeDisposition) {
        if let Some(reply) = self.reply.take() {
            // The transport may have stopped waiting.
            let _ = reply.send(disposition);
        }
    }
}

/// Protocol token as reported in metrics (ALPN style).
pub fn protocol_name(v: Version) -> &'static str {
    match v {
        Version::HTTP_09 => "http/0.9",
        Version::HTTP_10 => "http/1.0",
        Version::HTTP_11 => "http/1.1",
        Version::HTTP_2 => "h2",
        Version::HTTP_3 => "h3",
        _ => "http/1.1",
    }
}
