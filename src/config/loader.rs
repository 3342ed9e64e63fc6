//! Configuration structures and loading logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use secrecy::Secret;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transfer::DEFAULT_CONCURRENCY;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Upload endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the storage service (the `/upload` path is appended).
    #[serde(default)]
    pub endpoint: String,

    /// Bearer token sent with every upload.
    #[serde(default = "default_token")]
    pub token: Secret<String>,

    /// Storage channel selected on the server side.
    #[serde(default = "default_upload_channel")]
    pub upload_channel: String,

    /// Whether the server may recompress uploaded media.
    #[serde(default)]
    pub server_compress: bool,

    /// Whether the server retries its own backend writes.
    #[serde(default = "default_true")]
    pub auto_retry: bool,
}

/// Transfer pipeline tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Simultaneous requests per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per fetched URL.
    #[serde(default = "default_attempts")]
    pub fetch_attempts: u32,

    /// Per-request fetch timeout in seconds.
    #[serde(default = "default_transfer_timeout")]
    pub fetch_timeout_secs: u64,

    /// Pause between fetch attempts in milliseconds.
    #[serde(default)]
    pub fetch_retry_delay_ms: u64,

    /// Attempts per uploaded blob.
    #[serde(default = "default_attempts")]
    pub upload_attempts: u32,

    /// Per-request upload timeout in seconds.
    #[serde(default = "default_transfer_timeout")]
    pub upload_timeout_secs: u64,

    /// Pause between upload attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub upload_retry_delay_ms: u64,

    /// Attempts per availability probe.
    #[serde(default = "default_attempts")]
    pub probe_attempts: u32,

    /// Per-request probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Pause between probe attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub probe_retry_delay_ms: u64,

    /// Optional wall-clock limit for a whole run. Unset means no limit.
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,

    /// Whether to draw progress bars while transferring.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_attempts: default_attempts(),
            fetch_timeout_secs: default_transfer_timeout(),
            fetch_retry_delay_ms: 0,
            upload_attempts: default_attempts(),
            upload_timeout_secs: default_transfer_timeout(),
            upload_retry_delay_ms: default_retry_delay_ms(),
            probe_attempts: default_attempts(),
            probe_timeout_secs: default_probe_timeout(),
            probe_retry_delay_ms: default_retry_delay_ms(),
            run_deadline_secs: None,
            show_progress: true,
        }
    }
}

impl TransferConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}

/// Share-page resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Fixed user agent. When unset a random desktop user agent is used.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Page request timeout in seconds.
    #[serde(default = "default_page_timeout")]
    pub timeout_secs: u64,

    /// Base URL for rewritten image links.
    #[serde(default = "default_image_host")]
    pub image_host: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: default_page_timeout(),
            image_host: default_image_host(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: default_token(),
            upload_channel: default_upload_channel(),
            server_compress: false,
            auto_retry: true,
        }
    }
}

fn default_token() -> Secret<String> {
    Secret::new(String::new())
}

fn default_upload_channel() -> String {
    "telegram".to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_attempts() -> u32 {
    3
}

fn default_transfer_timeout() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_page_timeout() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_image_host() -> String {
    "https://ci.xiaohongshu.com".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Default configuration file location for the current platform.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "media-relay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// URL uploads are posted to.
    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.upload.endpoint.trim_end_matches('/'))
    }
}
