use core::{future::Future, time::Duration};

/// Abstracts over how an async runtime sleeps for a [`Duration`].
///
/// This keeps the generator independent of `tokio` or `smol`.
pub trait SleepProvider {
    /// The returned future is `Send` so generation can hop across worker
    /// threads.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}
