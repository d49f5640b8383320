use core::time::Duration;
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    DecodedId, Error, GeneratorState, IdGenStatus, Layout, Result, SystemClock, TimeSource,
    generator::{Mutex, MutexGuard, state::Tick},
};

/// A thread-safe generator of time-ordered 64-bit identifiers for one
/// `(datacenter_id, worker_id)` node.
///
/// Every attempt runs as one critical section over a [`GeneratorState`]: the
/// clock is read, reconciled against the last issued millisecond, and the
/// state is updated while the lock is held. IDs from one instance are
/// therefore strictly increasing, even when many threads share it.
///
/// Cloning is cheap and the clones share state, so a clone can be moved into
/// each thread or task.
///
/// ## Guarantees
/// - ✅ Thread-safe, strictly increasing per instance
/// - ✅ Clock rollback is reported, never absorbed
/// - ✅ Sequence exhaustion waits for the next millisecond instead of failing
///
/// ## Does not
/// - ❌ Order IDs across nodes beyond millisecond resolution
/// - ❌ Enforce that `(datacenter_id, worker_id)` is unique in a deployment
#[derive(Clone, Debug)]
pub struct IdGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<GeneratorState>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<GeneratorState>>,
    layout: Layout,
    datacenter_id: u64,
    worker_id: u64,
    max_wait: Option<Duration>,
    time: T,
}

impl IdGenerator<SystemClock> {
    /// Creates a generator using [`Layout::CANONICAL`] and the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if either id exceeds 31.
    ///
    /// # Example
    ///
    /// ```
    /// use flakeid::IdGenerator;
    ///
    /// let generator = IdGenerator::new(2, 3).unwrap();
    /// let first = generator.generate().unwrap();
    /// let second = generator.generate().unwrap();
    /// assert!(second > first);
    ///
    /// let parts = generator.decode(second);
    /// assert_eq!((parts.datacenter_id, parts.worker_id), (2, 3));
    ///
    /// assert!(IdGenerator::new(32, 0).is_err());
    /// ```
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::with_layout(Layout::CANONICAL, datacenter_id, worker_id, SystemClock)
    }
}

impl<T> IdGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for an explicit layout and time source.
    ///
    /// The node ids are validated against the layout here and never again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `datacenter_id` or
    /// `worker_id` does not fit its field.
    pub fn with_layout(layout: Layout, datacenter_id: u64, worker_id: u64, time: T) -> Result<Self> {
        layout.check_node(datacenter_id, worker_id)?;
        let state = Mutex::new(GeneratorState::new());
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(state),
            layout,
            datacenter_id,
            worker_id,
            max_wait: None,
            time,
        })
    }

    /// Bounds how long [`Self::generate`] waits for the clock to advance once
    /// the sequence is exhausted. Past the bound the call fails with
    /// [`Error::SequenceWaitTimeout`].
    ///
    /// Without a bound the wait is unlimited, which only matters if the clock
    /// stalls.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Returns a snapshot of the mutable state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned (std mutex
    /// only).
    pub fn state(&self) -> Result<GeneratorState> {
        Ok(*self.lock()?)
    }

    /// Splits an identifier into its fields using this generator's layout.
    pub fn decode(&self, id: u64) -> DecodedId {
        self.layout.decode(id)
    }

    /// Generates the next ID, waiting for the next millisecond if the current
    /// one is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRolledBack`] if the clock is behind the last issued
    ///   millisecond
    /// - [`Error::ClockBeforeEpoch`] or [`Error::TimestampOverflow`] if the
    ///   clock is outside the layout's range
    /// - [`Error::SequenceWaitTimeout`] if a maximum wait is configured and
    ///   exceeded
    /// - [`Error::LockPoisoned`] if the lock was poisoned (std mutex only)
    pub fn generate(&self) -> Result<u64> {
        self.generate_with(|_| core::hint::spin_loop())
    }

    /// Like [`Self::generate`], but calls `f` with the suggested back-off in
    /// milliseconds each time the sequence is exhausted.
    ///
    /// The lock is released while `f` runs.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    ///
    /// # Example
    ///
    /// ```
    /// use flakeid::IdGenerator;
    ///
    /// let generator = IdGenerator::new(0, 0).unwrap();
    /// let id = generator
    ///     .generate_with(|_| std::thread::yield_now())
    ///     .unwrap();
    /// assert!(generator.layout().is_valid(id));
    /// ```
    pub fn generate_with(&self, mut f: impl FnMut(u64)) -> Result<u64> {
        let mut started = None;
        loop {
            match self.try_poll_id()? {
                IdGenStatus::Ready { id } => return Ok(id),
                IdGenStatus::Pending { yield_for } => {
                    self.check_wait(&mut started)?;
                    f(yield_for);
                }
            }
        }
    }

    /// Makes a single generation attempt without waiting.
    ///
    /// # Returns
    /// - `Ok(IdGenStatus::Ready { id })`: a new ID
    /// - `Ok(IdGenStatus::Pending { yield_for })`: the sequence is exhausted;
    ///   retry after `yield_for` milliseconds
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`], except that it never times out.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.lock()?;
        // The clock is read under the lock; a reading taken before it could
        // be overtaken by another caller and look like a rollback.
        let now = self.elapsed_millis(state.last_timestamp())?;

        match state.advance(now, self.layout.max_sequence())? {
            Tick::Issued { sequence } => Ok(IdGenStatus::Ready {
                id: self
                    .layout
                    .compose(now, self.datacenter_id, self.worker_id, sequence),
            }),
            Tick::Exhausted => Ok(IdGenStatus::Pending { yield_for: 1 }),
        }
    }

    /// Fails once the caller has waited longer than `max_wait` on an
    /// exhausted sequence. `started` is set on the first pending attempt.
    pub(crate) fn check_wait(&self, started: &mut Option<Instant>) -> Result<()> {
        let Some(max_wait) = self.max_wait else {
            return Ok(());
        };
        let waited = started.get_or_insert_with(Instant::now).elapsed();
        if waited > max_wait {
            #[cfg(feature = "tracing")]
            tracing::warn!(?waited, ?max_wait, "clock did not advance past exhausted sequence");
            return Err(Error::SequenceWaitTimeout { waited });
        }
        Ok(())
    }

    /// Reads the clock relative to the epoch. A reading before the epoch is
    /// a rollback once an ID has been issued.
    fn elapsed_millis(&self, last: Option<u64>) -> Result<u64> {
        let now_ms = self.time.current_millis();
        let epoch_ms = self.layout.epoch_ms();
        let Some(elapsed_ms) = now_ms.checked_sub(epoch_ms) else {
            return Err(match last {
                Some(last) => GeneratorState::clock_behind(
                    last.saturating_add(epoch_ms) - now_ms,
                    last,
                ),
                None => Error::ClockBeforeEpoch { now_ms, epoch_ms },
            });
        };

        let max_ms = self.layout.max_timestamp();
        if elapsed_ms > max_ms {
            return Err(Error::TimestampOverflow { elapsed_ms, max_ms });
        }
        Ok(elapsed_ms)
    }

    fn lock(&self) -> Result<MutexGuard<'_, GeneratorState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}
