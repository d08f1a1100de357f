// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Process-wide interception switches.
//!
//! Two independent switches live here, both behind one mutex:
//! - the *hook*, consulted on every send, which intercepts requests from any
//!   session;
//! - *session patching*, consulted when a session is built, which wraps the
//!   new session's transport unless its delegate is excluded.
//!
//! Sessions use [`Registry::global`] unless given another registry, which is
//! how tests keep their state isolated.

use crate::intercept::Interceptor;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Delegate names whose sessions are never patched.
pub const DEFAULT_EXCLUDED_DELEGATES: &[&str] = &["GTMSessionFetcher"];

#[derive(Default)]
struct Inner {
    hook: Option<Arc<Interceptor>>,
    patch: Option<Patch>,
}

struct Patch {
    interceptor: Arc<Interceptor>,
    excluded: Vec<String>,
}

/// Cheap handle to shared switch state.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// A fresh registry independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Registry {
        GLOBAL.get_or_init(Registry::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("Registry lock poisoned, continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Install the hook. Returns false if one was already installed; the
    /// existing hook is kept.
    pub fn register_hook(&self, interceptor: Arc<Interceptor>) -> bool {
        let mut inner = self.lock();
        if inner.hook.is_some() {
            return false;
        }
        inner.hook = Some(interceptor);
        tracing::info!("interception hook registered");
        true
    }

    /// Remove the hook. Returns false when none was installed.
    pub fn unregister_hook(&self) -> bool {
        let removed = self.lock().hook.take().is_some();
        if removed {
            tracing::info!("interception hook unregistered");
        }
        removed
    }

    pub fn hook(&self) -> Option<Arc<Interceptor>> {
        self.lock().hook.clone()
    }

    /// Patch every session built from now on, except those whose delegate
    /// name contains one of `excluded`. Enabling twice keeps the first setup.
    pub fn enable_session_patching(&self, interceptor: Arc<Interceptor>, excluded: Vec<String>) -> bool {
        let mut inner = self.lock();
        if inner.patch.is_some() {
            return false;
        }
        tracing::info!(excluded = ?excluded, "session patching enabled");
        inner.patch = Some(Patch {
            interceptor,
            excluded,
        });
        true
    }

    /// Stop patching new sessions. Sessions already built stay patched.
    pub fn disable_session_patching(&self) -> bool {
        let removed = self.lock().patch.take().is_some();
        if removed {
            tracing::info!("session patching disabled");
        }
        removed
    }

    /// Stop patching only if `interceptor` is the one patching sessions.
    pub fn disable_session_patching_for(&self, interceptor: &Arc<Interceptor>) -> bool {
        let mut inner = self.lock();
        let owned = inner
            .patch
            .as_ref()
            .is_some_and(|patch| Arc::ptr_eq(&patch.interceptor, interceptor));
        if !owned {
            return false;
        }
        inner.patch = None;
        tracing::info!("session patching disabled");
        true
    }

    pub fn is_patching_enabled(&self) -> bool {
        self.lock().patch.is_some()
    }

    /// Interceptor to wrap a new session with, if patching applies to it.
    pub(crate) fn patch_for(&self, delegate: Option<&str>) -> Option<Arc<Interceptor>> {
        let inner = self.lock();
        let patch = inner.patch.as_ref()?;
        if let Some(name) = delegate {
            if patch.excluded.iter().any(|ex| name.contains(ex.as_str())) {
                tracing::debug!(delegate = name, "session excluded from patching");
                return None;
            }
        }
        Some(Arc::clone(&patch.interceptor))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Registry")
            .field("hook", &inner.hook.is_some())
            .field("patching", &inner.patch.is_some())
            .finish()
    }
}
