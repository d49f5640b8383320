#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

use crate::TimeSource;

/// The wall clock.
///
/// Readings follow every adjustment made to the system clock, including NTP
/// steps backwards, which the generator reports as
/// [`Error::ClockRolledBack`]. A clock set before 1970 reads as `0`.
///
/// [`Error::ClockRolledBack`]: crate::Error::ClockRolledBack
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}
