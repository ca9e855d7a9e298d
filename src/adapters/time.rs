//! Wall-clock time adapter.
//!
//! Provides the millisecond epoch timestamps stamped on each snapshot.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::ClockPort;

/// Clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    /// Milliseconds since the Unix epoch; `0` if the clock reads before it.
    fn epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
