//! PING / PONG watchdog.
//!
//! Receivers send a heartbeat PING every few seconds. If a whole
//! interval passes in silence the sender probes with its own PING and
//! shortens the wait; if the probe also goes unanswered for the retry
//! budget the connection is declared dead. Any inbound byte counts as
//! proof of life, whatever frame it turns out to belong to.
//!
//! ```text
//!            timeout / SendPing
//!   Idle ─────────────────────────► AwaitingPong ──timeout, budget 0──► dead
//!    ▲                                  │   ▲
//!    │        traffic observed          │   │ timeout / KeepWaiting
//!    └──────────────────────────────────┘   └──────┘
//! ```

use std::time::Duration;

use crate::config::KeepaliveConfig;

/// What the caller should do after a silent wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// First silent interval: send a PING now.
    SendPing,
    /// Still waiting for the PONG; budget remains.
    KeepWaiting,
    /// Budget exhausted: treat the connection as dead.
    ConnectionDead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepalivePhase {
    Idle,
    AwaitingPong,
}

#[derive(Debug, Clone)]
pub struct KeepaliveMonitor {
    config: KeepaliveConfig,
    wait_deadline: Duration,
    retry_budget: u32,
    awaiting_pong: bool,
}

impl KeepaliveMonitor {
    pub fn new(config: KeepaliveConfig) -> Self {
        Self {
            wait_deadline: config.ping_interval(),
            retry_budget: config.ping_retries,
            awaiting_pong: false,
            config,
        }
    }

    /// How long the next poll may wait for inbound bytes.
    pub fn wait_deadline(&self) -> Duration {
        self.wait_deadline
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn is_awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    pub fn phase(&self) -> KeepalivePhase {
        if self.awaiting_pong {
            KeepalivePhase::AwaitingPong
        } else {
            KeepalivePhase::Idle
        }
    }

    /// A poll waited the full deadline without any inbound bytes.
    pub fn on_timeout(&mut self) -> KeepaliveAction {
        if !self.awaiting_pong {
            self.awaiting_pong = true;
            self.wait_deadline = self.config.pong_wait();
            self.retry_budget = self.config.pong_retries;
            return KeepaliveAction::SendPing;
        }

        if self.retry_budget == 0 {
            return KeepaliveAction::ConnectionDead;
        }
        self.retry_budget -= 1;
        KeepaliveAction::KeepWaiting
    }

    /// Inbound bytes arrived.
    pub fn on_traffic_observed(&mut self) {
        self.awaiting_pong = false;
        self.wait_deadline = self.config.ping_interval();
        self.retry_budget = self.config.ping_retries;
    }
}

impl Default for KeepaliveMonitor {
    fn default() -> Self {
        Self::new(KeepaliveConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_default_interval() {
        let m = KeepaliveMonitor::default();
        assert_eq!(m.phase(), KeepalivePhase::Idle);
        assert_eq!(m.wait_deadline(), Duration::from_millis(6000));
        assert_eq!(m.retry_budget(), 1);
    }

    #[test]
    fn silence_triggers_ping_with_short_deadline() {
        let mut m = KeepaliveMonitor::default();
        assert_eq!(m.on_timeout(), KeepaliveAction::SendPing);
        assert!(m.is_awaiting_pong());
        assert_eq!(m.wait_deadline(), Duration::from_millis(500));
        assert_eq!(m.retry_budget(), 2);
    }

    #[test]
    fn continued_silence_exhausts_budget() {
        let mut m = KeepaliveMonitor::default();
        assert_eq!(m.on_timeout(), KeepaliveAction::SendPing);
        assert_eq!(m.on_timeout(), KeepaliveAction::KeepWaiting);
        assert_eq!(m.retry_budget(), 1);
        assert_eq!(m.on_timeout(), KeepaliveAction::KeepWaiting);
        assert_eq!(m.retry_budget(), 0);
        assert_eq!(m.on_timeout(), KeepaliveAction::ConnectionDead);
        // Stays dead until traffic shows up.
        assert_eq!(m.on_timeout(), KeepaliveAction::ConnectionDead);
    }

    #[test]
    fn traffic_resets_at_any_point() {
        let mut m = KeepaliveMonitor::default();
        m.on_timeout();
        m.on_timeout();
        m.on_traffic_observed();
        assert_eq!(m.phase(), KeepalivePhase::Idle);
        assert_eq!(m.wait_deadline(), Duration::from_millis(6000));
        assert_eq!(m.retry_budget(), 1);

        // A fresh silence starts a fresh probe.
        assert_eq!(m.on_timeout(), KeepaliveAction::SendPing);
    }

    #[test]
    fn custom_timings() {
        let mut m = KeepaliveMonitor::new(KeepaliveConfig {
            ping_interval_ms: 100,
            ping_retries: 3,
            pong_wait_ms: 10,
            pong_retries: 0,
        });
        assert_eq!(m.wait_deadline(), Duration::from_millis(100));
        assert_eq!(m.on_timeout(), KeepaliveAction::SendPing);
        assert_eq!(m.wait_deadline(), Duration::from_millis(10));
        assert_eq!(m.on_timeout(), KeepaliveAction::ConnectionDead);
    }
}
