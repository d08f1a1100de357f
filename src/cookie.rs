// SPDX-FileCopyrightText: 2026 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! A minimal cookie jar shared by sessions.
//!
//! Supports the attributes that decide where a cookie is sent back: `Domain`,
//! `Path` and expiry through `Max-Age`. Everything else is ignored.

use hyper::header::SET_COOKIE;
use hyper::{HeaderMap, Uri};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Without a `Domain` attribute the cookie only matches the exact host.
    pub host_only: bool,
}

impl StoredCookie {
    fn matches(&self, host: &str, path: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        };
        domain_ok && path_matches(&self.path, path)
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Default cookie path: the request path up to, not including, its last `/`.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => request_path[..i].to_string(),
    }
}

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a host-only cookie for `host` with path `/`.
    pub fn insert(&self, host: &str, name: &str, value: &str) {
        self.store(StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: host.to_ascii_lowercase(),
            path: "/".to_string(),
            host_only: true,
        });
    }

    fn store(&self, cookie: StoredCookie) {
        match self.cookies.write() {
            Ok(mut cookies) => {
                cookies.retain(|c| {
                    !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
                });
                cookies.push(cookie);
            }
            Err(_) => tracing::warn!("CookieJar lock poisoned during write"),
        }
    }

    fn remove(&self, name: &str, domain: &str, path: &str) {
        match self.cookies.write() {
            Ok(mut cookies) => {
                cookies.retain(|c| !(c.name == name && c.domain == domain && c.path == path))
            }
            Err(_) => tracing::warn!("CookieJar lock poisoned during write"),
        }
    }

    /// Apply every `Set-Cookie` header of a response received from `uri`.
    pub fn store_response_cookies(&self, uri: &Uri, headers: &HeaderMap) {
        let Some(host) = uri.host() else {
            return;
        };
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            self.apply_set_cookie(host, uri.path(), raw);
        }
    }

    fn apply_set_cookie(&self, host: &str, request_path: &str, raw: &str) {
        let mut parts = raw.split(';');
        let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
            tracing::trace!(cookie = raw, "ignoring malformed Set-Cookie");
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let host = host.to_ascii_lowercase();
        let mut domain = host.clone();
        let mut host_only = true;
        let mut path = default_path(request_path);
        let mut expired = false;

        for attr in parts {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => {
                    let d = val.trim_start_matches('.').to_ascii_lowercase();
                    if d.is_empty() {
                        continue;
                    }
                    // A server may only widen to a domain it belongs to.
                    if host != d && !host.ends_with(&format!(".{d}")) {
                        tracing::trace!(cookie = name, domain = %d, "rejecting foreign cookie domain");
                        return;
                    }
                    domain = d;
                    host_only = false;
                }
                "path" if val.starts_with('/') => path = val.to_string(),
                "max-age" => expired = val.parse::<i64>().map(|n| n <= 0).unwrap_or(false),
                _ => {}
            }
        }

        if expired {
            self.remove(name, &domain, &path);
        } else {
            self.store(StoredCookie {
                name: name.to_string(),
                value: value.trim().to_string(),
                domain,
                path,
                host_only,
            });
        }
    }

    /// Cookies to send to `uri`, longest path first.
    pub fn cookies_for(&self, uri: &Uri) -> Vec<(String, String)> {
        let Some(host) = uri.host() else {
            return Vec::new();
        };
        let path = uri.path();
        let mut matching: Vec<StoredCookie> = match self.cookies.read() {
            Ok(cookies) => cookies.iter().filter(|c| c.matches(host, path)).cloned().collect(),
            Err(_) => {
                tracing::warn!("CookieJar lock poisoned during read");
                Vec::new()
            }
        };
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching.into_iter().map(|c| (c.name, c.value)).collect()
    }

    /// Value for a `Cookie` request header, if any cookie applies.
    pub fn header_value(&self, uri: &Uri) -> Option<String> {
        let cookies = self.cookies_for(uri);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Compact form stored on records: `name=value;` per cookie, concatenated.
pub fn format_cookie_string(cookies: &[(String, String)]) -> String {
    cookies.iter().map(|(n, v)| format!("{n}={v};")).collect()
}
