use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::TimeSource;

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A time source that never goes backward.
///
/// The wall clock is sampled once at construction. From then on readings
/// advance with a monotonic timer (`Instant`), so NTP steps and manual clock
/// changes are ignored and the generator never observes a rollback. The
/// trade-off is drift: a long-running clock slowly diverges from wall time.
///
/// A background thread publishes the elapsed milliseconds into a shared
/// atomic, keeping syscalls off the hot path. Clones share that thread, which
/// exits once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    start_ms: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a clock anchored to the current wall-clock time.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use flakeid::{MonotonicClock, SystemClock, TimeSource};
    ///
    /// let clock = MonotonicClock::new();
    /// let first = clock.current_millis();
    /// std::thread::sleep(Duration::from_millis(5));
    ///
    /// // Never goes backward. Sleep accuracy varies, so only the ordering is
    /// // guaranteed.
    /// assert!(clock.current_millis() >= first);
    /// ```
    pub fn new() -> Self {
        let start = Instant::now();
        let start_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Absolute target time of the next tick
                let target = start + Duration::from_millis(tick);

                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let now_ms = start.elapsed().as_millis() as u64;
                inner_ref.current.store(now_ms, Ordering::Relaxed);

                // Align to the next tick after the current actual time
                tick = now_ms + 1;
            }
        });

        // Only this constructor ever sets the handle.
        let _ = inner._handle.set(handle);

        Self { inner, start_ms }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.start_ms + self.inner.current.load(Ordering::Relaxed)
    }
}
