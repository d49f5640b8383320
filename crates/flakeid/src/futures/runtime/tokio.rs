use core::{future::Future, time::Duration};

use crate::{IdGenerator, IdGeneratorAsyncExt, Result, SleepProvider, TimeSource};

/// A [`SleepProvider`] backed by Tokio's timer.
///
/// The default for applications built on Tokio.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }
}

/// A [`SleepProvider`] that yields to the Tokio scheduler instead of
/// sleeping.
///
/// More responsive at low concurrency, at the cost of tighter polling and
/// higher CPU use under load. With many concurrent tasks [`TokioSleep`] is
/// usually cheaper.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }
}

/// Async generation on the [`tokio`](https://docs.rs/tokio) runtime, using
/// [`TokioSleep`] as the back-off.
pub trait IdGeneratorAsyncTokioExt {
    /// Returns a future that resolves to the next ID.
    ///
    /// # Errors
    ///
    /// Resolves to the same errors as [`IdGenerator::generate`].
    fn generate_async(&self) -> impl Future<Output = Result<u64>>;
}

impl<T> IdGeneratorAsyncTokioExt for IdGenerator<T>
where
    T: TimeSource + Sync,
{
    fn generate_async(&self) -> impl Future<Output = Result<u64>> {
        self.generate_async_with::<TokioSleep>()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, vec::Vec};

    use futures::future::try_join_all;

    use super::*;
    use crate::{DEFAULT_EPOCH, Error, Layout, MonotonicClock};

    const TASKS: usize = 8;
    // Enough to cross several exhausted milliseconds per task
    const IDS_PER_TASK: usize = 4096 * 8;

    #[derive(Debug)]
    struct FixedTime(u64);
    impl TimeSource for FixedTime {
        fn current_millis(&self) -> u64 {
            self.0
        }
    }

    async fn many_unique_ids<S: SleepProvider>() {
        let generator = Arc::new(
            IdGenerator::with_layout(Layout::CANONICAL, 1, 1, MonotonicClock::default()).unwrap(),
        );

        let tasks = (0..TASKS).map(|_| {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(IDS_PER_TASK);
                for _ in 0..IDS_PER_TASK {
                    ids.push(generator.generate_async_with::<S>().await?);
                }
                Ok::<_, Error>(ids)
            })
        });

        let batches = try_join_all(tasks).await.unwrap();
        let mut seen = HashSet::with_capacity(TASKS * IDS_PER_TASK);
        for batch in batches {
            let batch = batch.unwrap();
            assert!(batch.windows(2).all(|w| w[0] < w[1]));
            for id in batch {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), TASKS * IDS_PER_TASK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn can_call_generate_async() {
        let generator = IdGenerator::new(4, 5).unwrap();
        let id = generator.generate_async().await.unwrap();
        let parts = generator.decode(id);
        assert_eq!((parts.datacenter_id, parts.worker_id), (4, 5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn generates_many_unique_ids_sleep() {
        many_unique_ids::<TokioSleep>().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn generates_many_unique_ids_yield() {
        many_unique_ids::<TokioYield>().await;
    }

    #[tokio::test]
    async fn async_wait_honours_max_wait() {
        let epoch = DEFAULT_EPOCH.as_millis() as u64;
        let generator = IdGenerator::with_layout(Layout::CANONICAL, 0, 0, FixedTime(epoch + 1))
            .unwrap()
            .with_max_wait(Duration::from_millis(3));
        for _ in 0..Layout::CANONICAL.ids_per_millisecond() {
            generator.generate_async().await.unwrap();
        }

        let err = generator.generate_async().await.unwrap_err();
        assert!(matches!(err, Error::SequenceWaitTimeout { .. }));
    }
}
