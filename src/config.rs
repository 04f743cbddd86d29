// Runtime configuration, read once from the environment by the entry point

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "LOOM_TRANSFER_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: String, value: String },
}

/// Where the source platform lives
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base for the embed, page and transcoding endpoints
    pub base_url: String,
    /// Host component a share link must contain
    pub host: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.loom.com".to_string(),
            host: "www.loom.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub upload_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            upload_base: "https://www.googleapis.com".to_string(),
        }
    }
}

/// Network configuration shared by every outbound call
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout for the short metadata, locator and probe requests
    pub timeout_secs: u64,

    /// Deadline for the media host to answer the relay request
    pub connect_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: 30,
            connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Probed sizes below this are flagged to the user. Never blocks a transfer.
    pub small_file_warning_bytes: u64,

    /// After a cancel the source stream is cut at once. This bounds how long
    /// the destination then gets to discard its partial write before the
    /// upload is dropped. Its outcome is never reported as a completion.
    pub cancel_grace_ms: u64,
}

impl TransferConfig {
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            small_file_warning_bytes: 100_000,
            cancel_grace_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub drive: DriveConfig,
    pub network: NetworkConfig,
    pub transfer: TransferConfig,
}

impl AppConfig {
    /// Build from `LOOM_TRANSFER_*` environment variables, defaults elsewhere
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |name: &str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => u64::from_str(&value).map_err(|_| ConfigError::InvalidNumber {
                    name: format!("{}{}", ENV_PREFIX, name),
                    value,
                }),
                None => Ok(default),
            }
        };

        let defaults = Self::default();

        Ok(Self {
            source: SourceConfig {
                base_url: var("SOURCE_BASE_URL").unwrap_or(defaults.source.base_url),
                host: var("SOURCE_HOST").unwrap_or(defaults.source.host),
            },
            drive: DriveConfig {
                upload_base: var("DRIVE_UPLOAD_BASE").unwrap_or(defaults.drive.upload_base),
            },
            network: NetworkConfig {
                proxy: var("PROXY"),
                timeout_secs: number("TIMEOUT_SECS", defaults.network.timeout_secs)?,
                connect_timeout_secs: number(
                    "CONNECT_TIMEOUT_SECS",
                    defaults.network.connect_timeout_secs,
                )?,
            },
            transfer: TransferConfig {
                small_file_warning_bytes: number(
                    "SMALL_FILE_BYTES",
                    defaults.transfer.small_file_warning_bytes,
                )?,
                cancel_grace_ms: number("CANCEL_GRACE_MS", defaults.transfer.cancel_grace_ms)?,
            },
        })
    }

    /// Misconfiguration that still lets the process start. The entry point
    /// logs these once.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.source.base_url.starts_with("https://") {
            warnings.push(format!(
                "Source base URL is not https: {}",
                self.source.base_url
            ));
        }
        if !self.drive.upload_base.starts_with("https://") {
            warnings.push(format!(
                "Drive upload base is not https: {}",
                self.drive.upload_base
            ));
        }
        if self.network.timeout_secs == 0 || self.network.connect_timeout_secs == 0 {
            warnings.push("A zero timeout makes every request fail immediately".to_string());
        }
        if let Some(proxy) = &self.network.proxy {
            if reqwest::Proxy::all(proxy.as_str()).is_err() {
                warnings.push(format!("Invalid proxy URL, connecting directly: {}", proxy));
            }
        }

        warnings
    }
}
