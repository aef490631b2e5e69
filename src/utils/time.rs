use std::time::SystemTime;
use std::time::UNIX_EPOCH;

#[cfg(test)]
use mockall::automock;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Source of the current instant.
///
/// Only used for soft phase derivation and record timestamps. Authorization decisions never
/// read the clock.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        timestamp_millis()
    }
}

/// return millisecond
pub fn timestamp_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        // Clock before epoch: report epoch rather than panicking
        .unwrap_or(0)
}
