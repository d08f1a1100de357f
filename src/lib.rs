// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! In-process HTTP traffic inspector.
//!
//! This library intercepts requests sent through [`session::Session`]s,
//! records each exchange into a concurrent [`ledger::Ledger`], and provides
//! filtered views and text exports over the recorded traffic.

pub mod body;
pub mod config;
pub mod content_type;
pub mod cookie;
pub mod error;
pub mod export;
pub mod format;
pub mod helpers;
pub mod intercept;
pub mod ledger;
pub mod metrics;
pub mod monitor;
pub mod query;
pub mod record;
pub mod registry;
pub mod serde_helpers;
pub mod session;
pub mod snapshot;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use monitor::Monitor;
