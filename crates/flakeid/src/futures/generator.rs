use core::{future::Future, time::Duration};

use super::SleepProvider;
use crate::{IdGenStatus, IdGenerator, Result, TimeSource};

/// Extension trait for generating IDs from async code.
///
/// Instead of spinning when the sequence is exhausted, the returned future
/// sleeps through the [`SleepProvider`] `S` and retries, so the runtime's
/// worker thread stays free for other tasks. A maximum wait configured with
/// [`IdGenerator::with_max_wait`] is honoured.
pub trait IdGeneratorAsyncExt {
    /// Returns a future that resolves to the next ID.
    ///
    /// # Errors
    ///
    /// Resolves to the same errors as [`IdGenerator::generate`].
    fn generate_async_with<S>(&self) -> impl Future<Output = Result<u64>>
    where
        S: SleepProvider;
}

impl<T> IdGeneratorAsyncExt for IdGenerator<T>
where
    T: TimeSource + Sync,
{
    fn generate_async_with<S>(&self) -> impl Future<Output = Result<u64>>
    where
        S: SleepProvider,
    {
        async move {
            let mut started = None;
            loop {
                let dur = match self.try_poll_id()? {
                    IdGenStatus::Ready { id } => return Ok(id),
                    IdGenStatus::Pending { yield_for } => {
                        self.check_wait(&mut started)?;
                        Duration::from_millis(yield_for)
                    }
                };
                S::sleep_for(dur).await;
            }
        }
    }
}
