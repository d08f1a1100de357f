// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Sessions: the entry point application code sends requests through.
//!
//! A session is built against a transport and a registry. At build time the
//! registry decides whether the session is transparently instrumented; at send
//! time it decides whether the global interception hook applies.

use crate::cookie::CookieJar;
use crate::error::{ErrorKind, TransportError};
use crate::intercept::InterceptingTransport;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::transport::{EventStream, Transport, TransportEvent};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Request, StatusCode, Version};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    Follow { max: u32 },
    Never,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Follow {
            max: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Per-session settings. Travels with each request in its extensions so the
/// transport and the interceptor see the same values.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Added to every request unless the request already sets the field.
    pub additional_headers: HeaderMap,
    /// Overall deadline for one exchange, redirects included.
    pub timeout: Option<Duration>,
    pub redirect_policy: RedirectPolicy,
    pub should_set_cookies: bool,
    pub cookie_jar: Option<Arc<CookieJar>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            additional_headers: HeaderMap::new(),
            timeout: None,
            redirect_policy: RedirectPolicy::default(),
            should_set_cookies: true,
            cookie_jar: None,
        }
    }
}

impl SessionConfig {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.additional_headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect_policy = policy;
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// The jar to read and write, when cookie handling is on.
    pub fn active_cookie_jar(&self) -> Option<&Arc<CookieJar>> {
        if self.should_set_cookies {
            self.cookie_jar.as_ref()
        } else {
            None
        }
    }
}

/// A fully read response, as returned by [`Session::fetch`].
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Locations visited through redirects, in order.
    pub redirects: Vec<String>,
    pub metrics: Option<Arc<Metrics>>,
}

pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    delegate: Option<String>,
    registry: Option<Registry>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Name of the consumer type owning the session. Sessions whose delegate
    /// matches an excluded name are never patched.
    pub fn delegate(mut self, delegate: impl Into<String>) -> Self {
        self.delegate = Some(delegate.into());
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Session {
        let registry = self.registry.unwrap_or_else(Registry::global);
        let transport = match registry.patch_for(self.delegate.as_deref()) {
            Some(interceptor) => {
                tracing::debug!(delegate = ?self.delegate, "session created with interception");
                Arc::new(InterceptingTransport::new(interceptor, self.transport)) as Arc<dyn Transport>
            }
            None => self.transport,
        };
        Session {
            config: Arc::new(self.config),
            transport,
            registry,
        }
    }
}

pub struct Session {
    config: Arc<SessionConfig>,
    transport: Arc<dyn Transport>,
    registry: Registry,
}

impl Session {
    pub fn builder(transport: Arc<dyn Transport>) -> SessionBuilder {
        SessionBuilder {
            transport,
            config: SessionConfig::default(),
            delegate: None,
            registry: None,
        }
    }

    /// Session with default settings on the global registry.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start an exchange and return its event stream.
    pub fn send(&self, mut request: Request<Bytes>) -> EventStream {
        request.extensions_mut().insert(Arc::clone(&self.config));
        match self.registry.hook() {
            Some(interceptor) => interceptor.intercept(request, self.transport.as_ref()),
            None => self.transport.open(request),
        }
    }

    /// Run an exchange to completion and collect the response.
    pub async fn fetch(&self, request: Request<Bytes>) -> Result<FetchedResponse, TransportError> {
        let mut stream = self.send(request);
        let mut head = None;
        let mut body = BytesMut::new();
        let mut redirects = Vec::new();
        let mut metrics = None;

        while let Some(event) = stream.next().await {
            match event? {
                TransportEvent::Head(h) => head = Some(h),
                TransportEvent::Chunk(chunk) => body.extend_from_slice(&chunk),
                TransportEvent::Redirected { location, .. } => redirects.push(location),
                TransportEvent::Metrics(m) => metrics = Some(m),
                // Unanswered challenges fall back to default handling.
                TransportEvent::Challenge(_) => {}
            }
        }

        let head = head.ok_or_else(|| {
            TransportError::new(ErrorKind::BadServerResponse, "exchange ended without a response")
        })?;
        Ok(FetchedResponse {
            status: head.status,
            version: head.version,
            headers: head.headers,
            body: body.freeze(),
            redirects,
            metrics,
        })
    }
}
