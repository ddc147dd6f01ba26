//! Per-agent configuration, consumed by the core as plain values.
//!
//! Argument parsing and process supervision live outside the core; this
//! struct is what they hand over. Defaults mirror the protocol
//! constants: balance threshold 0.15, round period 5s, reply timeout
//! 10s, liveness period at 1.5x the round period.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::directory::{AgentId, PeerRef};

pub const DEFAULT_BALANCE_THRESHOLD: f64 = 0.15;
pub const DEFAULT_ROUND_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// This agent's address.
    pub id: AgentId,
    /// Known peers with their capability tags.
    #[serde(default)]
    pub peers: Vec<PeerRef>,
    /// Capability tags this agent possesses.
    #[serde(default)]
    pub capabilities: HashSet<String>,
    /// Relative imbalance below which a pair counts as balanced.
    #[serde(default = "default_balance_threshold")]
    pub balance_threshold: f64,
    /// How often the round scheduler fires.
    #[serde(default = "default_round_period")]
    pub round_period: Duration,
    /// Bounded wait for any reply; an expired round is aborted.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout: Duration,
    /// How often the liveness monitor fires. Recommended at least
    /// 1.5x the round period.
    #[serde(default = "default_liveness_period")]
    pub liveness_period: Duration,
    /// Period of the backup save timer.
    #[serde(default = "default_save_interval")]
    pub save_interval: Duration,
}

fn default_balance_threshold() -> f64 {
    DEFAULT_BALANCE_THRESHOLD
}

fn default_round_period() -> Duration {
    DEFAULT_ROUND_PERIOD
}

fn default_reply_timeout() -> Duration {
    DEFAULT_REPLY_TIMEOUT
}

fn default_liveness_period() -> Duration {
    DEFAULT_ROUND_PERIOD.mul_f64(1.5)
}

fn default_save_interval() -> Duration {
    DEFAULT_SAVE_INTERVAL
}

impl AgentConfig {
    /// Configuration with protocol defaults, no peers, no capabilities.
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            peers: Vec::new(),
            capabilities: HashSet::new(),
            balance_threshold: default_balance_threshold(),
            round_period: default_round_period(),
            reply_timeout: default_reply_timeout(),
            liveness_period: default_liveness_period(),
            save_interval: default_save_interval(),
        }
    }

    pub fn with_peers(mut self, peers: Vec<PeerRef>) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_balance_threshold(mut self, threshold: f64) -> Self {
        self.balance_threshold = threshold;
        self
    }

    /// Set the round period and rescale the liveness period to 1.5x.
    pub fn with_round_period(mut self, period: Duration) -> Self {
        self.round_period = period;
        self.liveness_period = period.mul_f64(1.5);
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}
