//! Score source for index entries.

use crate::types::TimestampMs;

/// Supplies the score for newly published entries
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> TimestampMs;
}

/// Wall clock with millisecond resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> TimestampMs {
        // A clock before the epoch scores as 0 rather than failing the publish
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as TimestampMs)
    }
}
