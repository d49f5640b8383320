use core::{future::Future, time::Duration};

use crate::{IdGenerator, IdGeneratorAsyncExt, Result, SleepProvider, TimeSource};

/// A [`SleepProvider`] backed by smol's [`Timer`](smol::Timer).
pub struct SmolSleep;
impl SleepProvider for SmolSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        async move {
            smol::Timer::after(dur).await;
        }
    }
}

/// A [`SleepProvider`] that yields to the smol executor instead of sleeping.
pub struct SmolYield;
impl SleepProvider for SmolYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        smol::future::yield_now()
    }
}

/// Async generation on the [`smol`](https://docs.rs/smol) runtime, using
/// [`SmolSleep`] as the back-off.
pub trait IdGeneratorAsyncSmolExt {
    /// Returns a future that resolves to the next ID.
    ///
    /// # Errors
    ///
    /// Resolves to the same errors as [`IdGenerator::generate`].
    fn generate_async(&self) -> impl Future<Output = Result<u64>>;
}

impl<T> IdGeneratorAsyncSmolExt for IdGenerator<T>
where
    T: TimeSource + Sync,
{
    fn generate_async(&self) -> impl Future<Output = Result<u64>> {
        self.generate_async_with::<SmolSleep>()
    }
}
