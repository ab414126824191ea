use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Timing parameters of the state synchronizer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Delay before a debounced reload runs, coalescing bursts of watch
    /// callbacks into a single reload
    #[serde(default = "default_update_delay_ms")]
    pub update_delay_ms: u64,

    /// Interval between leader-discovery polls of the snapshot
    #[serde(default = "default_leader_poll_interval_ms")]
    pub leader_poll_interval_ms: u64,

    /// Leader-discovery budget used when the caller does not supply one
    #[serde(default = "default_leader_timeout_ms")]
    pub default_leader_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            update_delay_ms: default_update_delay_ms(),
            leader_poll_interval_ms: default_leader_poll_interval_ms(),
            default_leader_timeout_ms: default_leader_timeout_ms(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.leader_poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "leader_poll_interval_ms must be at least 1ms".into(),
            )));
        }
        if self.default_leader_timeout_ms < self.leader_poll_interval_ms {
            return Err(Error::Config(ConfigError::Message(
                "default_leader_timeout_ms must be at least leader_poll_interval_ms".into(),
            )));
        }
        Ok(())
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn leader_poll_interval(&self) -> Duration {
        Duration::from_millis(self.leader_poll_interval_ms)
    }

    pub fn default_leader_timeout(&self) -> Duration {
        Duration::from_millis(self.default_leader_timeout_ms)
    }
}

fn default_update_delay_ms() -> u64 {
    5000
}
fn default_leader_poll_interval_ms() -> u64 {
    50
}
fn default_leader_timeout_ms() -> u64 {
    4000
}
