//! Sender configuration.

use std::path::Path;
use std::time::Duration;

use castwire_core::{DEFAULT_CONTROL_PORT, LoadRequest, SessionConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Where the receiver is.
    pub network: NetworkConfig,
    /// Transport and keepalive tuning.
    pub session: SessionConfig,
    /// What to play.
    pub media: MediaConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver IP address or host name.
    pub host: String,
    /// Control port; 0 means the default.
    pub port: u16,
    /// How long a GET_STATUS, LAUNCH or LOAD may go unanswered.
    pub request_timeout_ms: u64,
}

/// The stream this host serves at `http://<local-ip>:<stream_port>/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub stream_port: u16,
    pub title: String,
    /// Artwork URL; ignored unless http(s).
    pub artwork: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_CONTROL_PORT,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            stream_port: 8010,
            title: String::new(),
            artwork: String::new(),
            mime: "video/mp4".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Accessors ────────────────────────────────────────────────────

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl MediaConfig {
    pub fn load_request(&self) -> LoadRequest {
        LoadRequest {
            port: self.stream_port,
            title: self.title.clone(),
            artwork: self.artwork.clone(),
            mime: self.mime.clone(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The defaults as pretty TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────
