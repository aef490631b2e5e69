use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Upper bound for one store operation, and for waiting on an election's transition lock.
    ///
    /// The bound applies per step, not per engine call. `advance` waits on the lock and then
    /// makes up to three store calls, so it may take up to four times this value before
    /// failing with `Timeout`.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Buffer of the election event broadcast channel. Slow subscribers lag past this.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(invalid("operation_timeout_ms must be greater than 0".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(invalid("event_channel_capacity must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_operation_timeout_ms() -> u64 {
    5_000
}

fn default_event_channel_capacity() -> usize {
    256
}
