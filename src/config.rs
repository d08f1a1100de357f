// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading.

use crate::intercept::InterceptConfig;
use crate::ledger::DEFAULT_CHANNEL_CAPACITY;
use crate::registry::DEFAULT_EXCLUDED_DELEGATES;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Maximum records kept in the ledger; 0 keeps everything.
    #[serde(default)]
    pub max_records: usize,

    /// Buffered change notifications per subscriber.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_records: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_request_bodies")]
    pub request_bodies: bool,

    /// Cookies sent by the session jar are recorded only when set.
    #[serde(default)]
    pub cookies: bool,
}

fn default_request_bodies() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            request_bodies: default_request_bodies(),
            cookies: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchingConfig {
    /// Sessions whose delegate name contains one of these are never patched.
    #[serde(default = "default_excluded_delegates")]
    pub excluded_delegates: Vec<String>,
}

fn default_excluded_delegates() -> Vec<String> {
    DEFAULT_EXCLUDED_DELEGATES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PatchingConfig {
    fn default() -> Self {
        Self {
            excluded_delegates: default_excluded_delegates(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub patching: PatchingConfig,
}

impl Config {
    /// Load configuration from a TOML file. Every table and key is optional:
    ///
    /// ```toml
    /// [general]
    /// max_records = 0
    /// channel_capacity = 64
    ///
    /// [capture]
    /// request_bodies = true
    /// cookies = false
    ///
    /// [patching]
    /// excluded_delegates = ["GTMSessionFetcher"]
    /// ```
    pub async fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let s = tokio::fs::read_to_string(path_ref).await?;
        let cfg: Self = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.general.channel_capacity == 0 {
            anyhow::bail!("general.channel_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn intercept_config(&self) -> InterceptConfig {
        InterceptConfig {
            capture_request_bodies: self.capture.request_bodies,
            capture_cookies: self.capture.cookies,
        }
    }
}
