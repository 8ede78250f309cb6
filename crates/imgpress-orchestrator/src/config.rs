/*
[INPUT]:  YAML configuration file (every field optional)
[OUTPUT]: Parsed and validated client, upload and processing settings
[POS]:    Configuration layer - session setup
[UPDATE]: When adding new configuration options
*/

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail, ensure};
use imgpress_adapter::{ClientConfig, DEFAULT_BASE_URL, Url};
use serde::{Deserialize, Serialize};

use crate::options::{DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::process::ProcessSettings;
use crate::upload::UploadSettings;

/// Top-level configuration for the imgpress client
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Remote processing service
    pub service: ServiceConfig,
    /// Upload progress feedback
    pub upload: UploadConfig,
    /// Processing defaults and polling cadence
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Base URL every endpoint is resolved against
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub progress_tick_ms: u64,
    pub progress_step: u8,
    /// Highest synthetic progress shown before the server answers
    pub progress_ceiling: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            progress_tick_ms: 100,
            progress_step: 10,
            progress_ceiling: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub poll_interval_ms: u64,
    /// Polling gives up with a timeout failure after this long
    pub max_poll_duration_secs: u64,
    /// Quality the options form starts from
    pub default_quality: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_poll_duration_secs: 300,
            default_quality: DEFAULT_QUALITY,
        }
    }
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings the coordinators cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.service.base_url)
            .with_context(|| format!("invalid service.base_url {:?}", self.service.base_url))?;
        if url.cannot_be_a_base() {
            bail!("service.base_url {url} cannot be used as a base URL");
        }
        ensure!(self.service.timeout_secs > 0, "service.timeout_secs must be positive");
        ensure!(
            self.service.connect_timeout_secs > 0,
            "service.connect_timeout_secs must be positive"
        );

        ensure!(self.upload.progress_tick_ms > 0, "upload.progress_tick_ms must be positive");
        ensure!(self.upload.progress_step > 0, "upload.progress_step must be positive");
        ensure!(
            self.upload.progress_ceiling < 100,
            "upload.progress_ceiling must stay below 100, got {}",
            self.upload.progress_ceiling
        );

        ensure!(
            self.processing.poll_interval_ms > 0,
            "processing.poll_interval_ms must be positive"
        );
        ensure!(
            self.processing.max_poll_duration_secs > 0,
            "processing.max_poll_duration_secs must be positive"
        );
        ensure!(
            (MIN_QUALITY..=MAX_QUALITY).contains(&self.processing.default_quality),
            "processing.default_quality must be between {MIN_QUALITY} and {MAX_QUALITY}, got {}",
            self.processing.default_quality
        );
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.service.timeout_secs),
            connect_timeout: Duration::from_secs(self.service.connect_timeout_secs),
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            progress_tick: Duration::from_millis(self.upload.progress_tick_ms),
            progress_step: self.upload.progress_step,
            progress_ceiling: self.upload.progress_ceiling,
        }
    }

    pub fn process_settings(&self) -> ProcessSettings {
        ProcessSettings {
            poll_interval: Duration::from_millis(self.processing.poll_interval_ms),
            max_poll_duration: Duration::from_secs(self.processing.max_poll_duration_secs),
        }
    }
}
