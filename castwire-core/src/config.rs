//! Session configuration.
//!
//! Every section is `#[serde(default)]` so a partial TOML table in the
//! embedding application only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one [`CastSession`](crate::CastSession).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// TCP / TLS establishment.
    pub transport: TransportConfig,
    /// PING / PONG watchdog.
    pub keepalive: KeepaliveConfig,
}

/// TCP / TLS establishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Validate the receiver's certificate against WebPKI roots.
    ///
    /// Receivers present self-signed device certificates, so this is
    /// off by default; handshake signatures are checked either way.
    pub verify_peer: bool,
}

/// PING / PONG watchdog timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Silence tolerated before probing with a PING, in milliseconds.
    pub ping_interval_ms: u64,
    /// Retry budget restored whenever traffic is seen.
    pub ping_retries: u32,
    /// Wait for a PONG after probing, in milliseconds.
    pub pong_wait_ms: u64,
    /// Extra silent waits allowed after the probe before giving up.
    pub pong_retries: u32,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            verify_peer: false,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        // Receivers send a PING roughly every 5 seconds.
        Self {
            ping_interval_ms: 6000,
            ping_retries: 1,
            pong_wait_ms: 500,
            pong_retries: 2,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl KeepaliveConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }
}
