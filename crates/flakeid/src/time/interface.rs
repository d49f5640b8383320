use core::time::Duration;
use std::sync::Arc;

/// Epoch used by [`Layout::CANONICAL`]: Saturday, November 26, 2016
/// 13:21:05.631 UTC.
///
/// [`Layout::CANONICAL`]: crate::Layout::CANONICAL
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_480_166_465_631);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// A source of the current time in **milliseconds since the Unix epoch**.
///
/// The generator subtracts the layout epoch itself, so implementations report
/// absolute time. Plug in [`SystemClock`], [`MonotonicClock`], or a mock in
/// tests.
///
/// # Example
///
/// ```
/// use flakeid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_700_000_000_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_700_000_000_000);
/// ```
///
/// [`SystemClock`]: crate::SystemClock
/// [`MonotonicClock`]: crate::MonotonicClock
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
