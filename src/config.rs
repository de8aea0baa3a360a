use std::time::Duration;
use crate::UserId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Who we are and who hosts the session. Every registry is constructed with one of these.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionContext {
    pub local_user: UserId,
    pub host: UserId,
}

impl SessionContext {
    pub fn new(local_user: UserId, host: UserId) -> Self {
        Self { local_user, host }
    }

    /// Context for the host's own process.
    pub fn host(host: UserId) -> Self {
        Self { local_user: host.clone(), host }
    }

    pub fn is_host(&self) -> bool {
        self.local_user == self.host
    }
}

/// Tunables. The defaults are what you want unless you're writing tests.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    /// How often idle documents send a no-op to acknowledge what they've received.
    pub heartbeat_interval: Duration,

    /// Log a warning when this many of our operations are waiting to be acknowledged by one peer.
    pub ack_queue_warn_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(60),
            ack_queue_warn_len: 50,
        }
    }
}

impl Config {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_ack_queue_warn_len(mut self, len: usize) -> Self {
        self.ack_queue_warn_len = len;
        self
    }
}
