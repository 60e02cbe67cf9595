//! Client configuration parameters
//!
//! Device credential, server address and sync timing.  Values can be
//! provisioned once and persisted through the [`Storage`] port.

use core::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::{Storage, StorageError};

/// Storage key holding the JSON-encoded [`ClientConfig`].
pub const CONFIG_KEY: &str = "cfg";
/// Storage key holding the bare device credential.
pub const DEVICE_KEY_KEY: &str = "devkey";

/// Core client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    // --- Identity ---
    /// Static device credential, sent as `X-DEVICE-KEY` on every request
    pub device_key: String,
    /// Base server address, e.g. `http://192.168.1.10:8080`
    pub server_url: String,

    // --- Timing ---
    /// Interval between heartbeat + pull cycles (milliseconds)
    pub heartbeat_interval_ms: u32,

    // --- Retry ---
    /// Extra attempts after the first empty response
    pub retries: u8,
    /// Backoff unit; attempt `n` waits `n * retry_base_delay_ms`
    pub retry_base_delay_ms: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_key: String::new(),
            server_url: "http://localhost:8080".to_string(),

            // Timing
            heartbeat_interval_ms: 30_000, // 30 s

            // Retry
            retries: 1,
            retry_base_delay_ms: 100,
        }
    }
}

impl ClientConfig {
    /// Configuration for `device_key` talking to `server_url`, other
    /// fields at their defaults.  A trailing `/` on the URL is dropped.
    pub fn new(device_key: &str, server_url: &str) -> Self {
        Self {
            device_key: device_key.to_string(),
            server_url: normalize_url(server_url),
            ..Default::default()
        }
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_key.is_empty() {
            return Err(ConfigError::ValidationFailed("device_key must not be empty"));
        }
        if !is_printable_ascii(&self.device_key) {
            return Err(ConfigError::ValidationFailed(
                "device_key must be printable ASCII",
            ));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(
                "server_url must start with http:// or https://",
            ));
        }
        if self.heartbeat_interval_ms < 1_000 {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be >= 1000",
            ));
        }
        if self.retries > 10 {
            return Err(ConfigError::ValidationFailed("retries must be 0–10"));
        }
        if self.retry_base_delay_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "retry_base_delay_ms must be 0–10000",
            ));
        }
        Ok(())
    }

    /// Load configuration from storage.
    /// Returns [`ClientConfig::default()`] if nothing is stored yet.
    pub fn load(storage: &impl Storage) -> Result<Self, ConfigError> {
        match storage.load(CONFIG_KEY) {
            Some(json) => {
                let mut cfg: Self =
                    serde_json::from_str(&json).map_err(|_| ConfigError::Corrupted)?;
                cfg.server_url = normalize_url(&cfg.server_url);
                info!("Config: loaded from storage");
                Ok(cfg)
            }
            None => {
                info!("Config: nothing stored, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate and persist.
    pub fn save(&self, storage: &mut impl Storage) -> Result<(), ConfigError> {
        self.validate()?;
        let json = serde_json::to_string(self).map_err(|_| ConfigError::IoError)?;
        if storage.save(CONFIG_KEY, &json) {
            info!("Config: saved ({} bytes)", json.len());
            Ok(())
        } else {
            Err(ConfigError::IoError)
        }
    }

    /// Persist both the config and the bare credential in one step.
    pub fn provision(&self, storage: &mut impl Storage) -> crate::error::Result<()> {
        self.save(storage)?;
        store_device_key(storage, &self.device_key)?;
        Ok(())
    }
}

// ── Credential helpers ────────────────────────────────────────

/// Persist the device credential under [`DEVICE_KEY_KEY`].
pub fn store_device_key(storage: &mut impl Storage, key: &str) -> Result<(), StorageError> {
    if storage.save(DEVICE_KEY_KEY, key) {
        Ok(())
    } else {
        Err(StorageError::WriteFailed)
    }
}

/// Read the device credential stored under [`DEVICE_KEY_KEY`].
pub fn load_device_key(storage: &impl Storage) -> Result<String, StorageError> {
    storage.load(DEVICE_KEY_KEY).ok_or(StorageError::NotFound)
}

fn normalize_url(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

// ── Errors ────────────────────────────────────────────────────

/// Errors from loading, validating or saving a [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The storage backend refused the write.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
