// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Transport failures as recorded on a record and surfaced to callers.

use serde::Serialize;
use std::error::Error as StdError;
use std::io;

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unknown,
    Cancelled,
    BadUrl,
    TimedOut,
    UnsupportedUrl,
    CannotFindHost,
    CannotConnectToHost,
    NetworkConnectionLost,
    DnsLookupFailed,
    TooManyRedirects,
    RedirectToNonExistentLocation,
    BadServerResponse,
    SecureConnectionFailed,
    ServerCertificateHasBadDate,
    ServerCertificateUntrusted,
    ServerCertificateHasUnknownRoot,
    ClientCertificateRejected,
    CannotDecodeContentData,
    CannotParseResponse,
    UserCancelledAuthentication,
}

impl ErrorKind {
    /// Short human title, as shown in status summaries.
    pub fn short_description(self) -> &'static str {
        match self {
            ErrorKind::Unknown => "Unknown",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::BadUrl => "Bad URL",
            ErrorKind::TimedOut => "Timed Out",
            ErrorKind::UnsupportedUrl => "Unsupported URL",
            ErrorKind::CannotFindHost => "Cannot Find Host",
            ErrorKind::CannotConnectToHost => "Cannot Connect To Host",
            ErrorKind::NetworkConnectionLost => "Network Connection Lost",
            ErrorKind::DnsLookupFailed => "DNS Lookup Failed",
            ErrorKind::TooManyRedirects => "HTTP Too Many Redirects",
            ErrorKind::RedirectToNonExistentLocation => "Redirect To Non Existent Location",
            ErrorKind::BadServerResponse => "Bad Server Response",
            ErrorKind::SecureConnectionFailed => "Secure Connection Failed",
            ErrorKind::ServerCertificateHasBadDate => "Server Certificate Bad Date",
            ErrorKind::ServerCertificateUntrusted => "Server Certificate Untrusted",
            ErrorKind::ServerCertificateHasUnknownRoot => "Server Certificate Unknown Root",
            ErrorKind::ClientCertificateRejected => "Client Certificate Rejected",
            ErrorKind::CannotDecodeContentData => "Cannot Decode Content Data",
            ErrorKind::CannotParseResponse => "Cannot Parse Response",
            ErrorKind::UserCancelledAuthentication => "User Cancelled Authentication",
        }
    }
}

/// A failed exchange. Cheap to clone so the same value can be stored on the
/// record and returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", kind.short_description())]
pub struct TransportError {
    kind: ErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "exchange cancelled before completion")
    }

    pub fn timed_out() -> Self {
        Self::new(ErrorKind::TimedOut, "the request timed out")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classify a client-side failure by walking its source chain.
    pub fn from_client_error(err: &hyper_util::client::legacy::Error) -> Self {
        let kind = match classify_chain(err) {
            ErrorKind::Unknown if err.is_connect() => ErrorKind::CannotConnectToHost,
            kind => kind,
        };
        Self::new(kind, chain_message(err))
    }

    /// Classify a failure while reading the response body.
    pub fn from_body_error(err: &hyper::Error) -> Self {
        let kind = match classify_chain(err) {
            ErrorKind::Unknown => ErrorKind::NetworkConnectionLost,
            kind => kind,
        };
        Self::new(kind, chain_message(err))
    }
}

fn classify_chain(err: &(dyn StdError + 'static)) -> ErrorKind {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let kind = classify_one(e);
        if kind != ErrorKind::Unknown {
            return kind;
        }
        current = e.source();
    }
    ErrorKind::Unknown
}

fn classify_one(err: &(dyn StdError + 'static)) -> ErrorKind {
    if let Some(tls) = err.downcast_ref::<rustls::Error>() {
        return classify_tls(tls);
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        // rustls surfaces handshake failures as io::Error wrapping rustls::Error
        if let Some(tls) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        {
            return classify_tls(tls);
        }
        return match io_err.kind() {
            io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotConnected => {
                ErrorKind::CannotConnectToHost
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ErrorKind::NetworkConnectionLost,
            _ => ErrorKind::Unknown,
        };
    }
    if let Some(h) = err.downcast_ref::<hyper::Error>() {
        if h.is_timeout() {
            return ErrorKind::TimedOut;
        }
        if h.is_canceled() {
            return ErrorKind::Cancelled;
        }
        if h.is_parse() {
            return ErrorKind::CannotParseResponse;
        }
        if h.is_incomplete_message() {
            return ErrorKind::NetworkConnectionLost;
        }
    }
    // The connector's resolver error type is private; its message is stable.
    if err.to_string().starts_with("dns error") {
        return ErrorKind::CannotFindHost;
    }
    ErrorKind::Unknown
}

fn classify_tls(err: &rustls::Error) -> ErrorKind {
    use rustls::CertificateError;
    match err {
        rustls::Error::InvalidCertificate(CertificateError::Expired)
        | rustls::Error::InvalidCertificate(CertificateError::NotValidYet) => {
            ErrorKind::ServerCertificateHasBadDate
        }
        rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer) => {
            ErrorKind::ServerCertificateHasUnknownRoot
        }
        rustls::Error::InvalidCertificate(_) => ErrorKind::ServerCertificateUntrusted,
        _ => ErrorKind::SecureConnectionFailed,
    }
}

fn chain_message(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}
