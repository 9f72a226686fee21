//! Outstanding request tracking.
//!
//! Receivers answer receiver- and media-namespace commands with a
//! message echoing the `requestId`. The tracker remembers what was
//! asked and when, so replies can be matched and silence detected.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::namespace::Namespace;
use crate::protocol::Command;

/// A request that has not been answered yet.
#[derive(Debug, Clone)]
pub struct TrackedRequest {
    /// What was sent.
    pub command: Command,
    /// When it was sent.
    pub sent_at: Instant,
    /// Optional deadline; `None` means no timeout.
    pub deadline: Option<Duration>,
}

impl TrackedRequest {
    /// Returns `true` if this request has exceeded its deadline.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.deadline {
            Some(d) => now.saturating_duration_since(self.sent_at) > d,
            None => false,
        }
    }

    /// How long this request has been in flight.
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }
}

/// Request ids are only unique per namespace.
pub type RequestKey = (Namespace, u32);

#[derive(Debug, Default)]
pub struct RequestTracker {
    requests: HashMap<RequestKey, TrackedRequest>,
    default_timeout: Option<Duration>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker whose requests expire after `timeout` unless told otherwise.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            requests: HashMap::new(),
            default_timeout: Some(timeout),
        }
    }

    /// Track a request under the default timeout.
    pub fn track(&mut self, request_id: u32, command: Command) {
        self.track_with_deadline(request_id, command, self.default_timeout);
    }

    pub fn track_with_deadline(
        &mut self,
        request_id: u32,
        command: Command,
        deadline: Option<Duration>,
    ) {
        self.requests.insert(
            (command.namespace(), request_id),
            TrackedRequest {
                command,
                sent_at: Instant::now(),
                deadline,
            },
        );
    }

    /// Complete a request, returning what it was if it was pending.
    pub fn resolve(&mut self, namespace: Namespace, request_id: u32) -> Option<TrackedRequest> {
        self.requests.remove(&(namespace, request_id))
    }

    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    pub fn is_pending(&self, namespace: Namespace, request_id: u32) -> bool {
        self.requests.contains_key(&(namespace, request_id))
    }

    pub fn get(&self, namespace: Namespace, request_id: u32) -> Option<&TrackedRequest> {
        self.requests.get(&(namespace, request_id))
    }

    /// Keys of all requests past their deadline.
    ///
    /// Does not remove them; see [`drain_expired`](Self::drain_expired).
    pub fn check_timeouts(&self) -> Vec<RequestKey> {
        let now = Instant::now();
        self.requests
            .iter()
            .filter(|(_, req)| req.is_expired_at(now))
            .map(|(&key, _)| key)
            .collect()
    }

    /// Remove and return all expired requests.
    pub fn drain_expired(&mut self) -> Vec<(RequestKey, TrackedRequest)> {
        self.check_timeouts()
            .into_iter()
            .filter_map(|key| self.requests.remove(&key).map(|r| (key, r)))
            .collect()
    }

    /// Forget everything, e.g. after reconnecting.
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
