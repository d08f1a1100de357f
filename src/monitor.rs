// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Application facing entry point: one ledger, the interceptor that feeds it
//! and the registry switches that decide which sessions are observed.

use crate::config::Config;
use crate::intercept::Interceptor;
use crate::ledger::{Ledger, LedgerEvent, NewRecordHook};
use crate::query::Query;
use crate::record::{CustomEntry, Headers, Record, RecordId};
use crate::registry::Registry;
use crate::session::{Session, SessionBuilder};
use crate::snapshot::Snapshot;
use crate::transport::Transport;
use bytes::Bytes;
use hyper::Uri;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct Monitor {
    ledger: Arc<Ledger>,
    interceptor: Arc<Interceptor>,
    registry: Registry,
    excluded_delegates: Vec<String>,
}

impl Monitor {
    /// Monitor driving the process-wide registry.
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, Registry::global())
    }

    pub fn with_registry(config: &Config, registry: Registry) -> Self {
        let ledger = Arc::new(Ledger::new(
            config.general.max_records,
            config.general.channel_capacity,
        ));
        let interceptor = Arc::new(Interceptor::new(Arc::clone(&ledger), config.intercept_config()));
        Self {
            ledger,
            interceptor,
            registry,
            excluded_delegates: config.patching.excluded_delegates.clone(),
        }
    }

    /// Observe every request sent through any session on this registry.
    /// Returns false if a hook was already installed.
    pub fn start_intercepting(&self) -> bool {
        self.registry.register_hook(Arc::clone(&self.interceptor))
    }

    /// Remove the hook, if it is this monitor's.
    pub fn stop_intercepting(&self) -> bool {
        match self.registry.hook() {
            Some(hook) if Arc::ptr_eq(&hook, &self.interceptor) => self.registry.unregister_hook(),
            _ => false,
        }
    }

    /// Instrument sessions built from now on, except excluded delegates.
    pub fn enable_automatic_registration(&self) -> bool {
        self.registry
            .enable_session_patching(Arc::clone(&self.interceptor), self.excluded_delegates.clone())
    }

    /// Stop instrumenting new sessions, if this monitor enabled it.
    pub fn disable_automatic_registration(&self) -> bool {
        self.registry.disable_session_patching_for(&self.interceptor)
    }

    /// Insert a log entry.
    pub fn record(&self, entry: CustomEntry) -> RecordId {
        let record = Record::from_entry(&entry);
        let id = record.id;
        tracing::debug!(id = %id, level = entry.level.title(), label = %entry.label, "log recorded");
        self.ledger.upsert(record);
        id
    }

    /// Insert an application defined event for `url`. Returns None when the
    /// url does not parse.
    pub fn custom(&self, url: &str, data: Option<Bytes>, parameters: Headers) -> Option<RecordId> {
        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(url, error = %e, "ignoring custom event with invalid url");
                return None;
            }
        };
        let record = Record::custom_event(&uri, data, parameters);
        let id = record.id;
        self.ledger.upsert(record);
        Some(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ledger.subscribe()
    }

    /// Called once for each new network record, on the thread that sent the
    /// request. Keep it short; hand slow work to a task or channel.
    pub fn set_new_record_hook<F>(&self, hook: F)
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        self.ledger.set_new_record_hook(Some(Arc::new(hook) as NewRecordHook));
    }

    pub fn clear_new_record_hook(&self) {
        self.ledger.set_new_record_hook(None);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.ledger.snapshot()
    }

    /// Current records through `query`.
    pub fn view(&self, query: &Query) -> Vec<Arc<Record>> {
        query.apply(&self.ledger.snapshot())
    }

    pub fn clear_all(&self) {
        self.ledger.clear();
    }

    pub fn delete(&self, id: RecordId) -> bool {
        self.ledger.delete(id)
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Session builder bound to this monitor's registry.
    pub fn session(&self, transport: Arc<dyn Transport>) -> SessionBuilder {
        Session::builder(transport).registry(self.registry.clone())
    }
}
