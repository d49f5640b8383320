use core::time::Duration;

/// A result type defaulting to the crate [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `flakeid` can produce.
///
/// Sequence exhaustion is never reported here: the generator absorbs it by
/// waiting for the next millisecond.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A node id or layout width is outside its allotted range.
    ///
    /// Raised at construction time only. Not retryable without changing the
    /// input.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration {
        /// Name of the offending setting.
        field: &'static str,
        /// Human readable description of the violated bound.
        reason: String,
    },

    /// The clock reads earlier than the last millisecond an ID was issued
    /// for.
    ///
    /// Generator state is left untouched, so a later call succeeds once the
    /// clock catches up.
    #[error("clock moved backwards by {rollback_ms} ms")]
    ClockRolledBack {
        /// `last_timestamp - current`, in milliseconds.
        rollback_ms: u64,
    },

    /// The clock reads earlier than the layout epoch.
    #[error("clock ({now_ms} ms) is before the layout epoch ({epoch_ms} ms)")]
    ClockBeforeEpoch {
        /// Clock reading, in milliseconds since the Unix epoch.
        now_ms: u64,
        /// Layout epoch, in milliseconds since the Unix epoch.
        epoch_ms: u64,
    },

    /// The time elapsed since the epoch no longer fits the timestamp field.
    #[error("{elapsed_ms} ms since epoch exceeds the timestamp field maximum of {max_ms} ms")]
    TimestampOverflow {
        /// Milliseconds elapsed since the layout epoch.
        elapsed_ms: u64,
        /// Largest encodable timestamp.
        max_ms: u64,
    },

    /// The sequence was exhausted and the clock did not advance within the
    /// configured maximum wait.
    #[error("sequence exhausted and clock did not advance within {waited:?}")]
    SequenceWaitTimeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant only exists with
    /// the std mutex.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Returns `true` for transient conditions that may succeed on a later
    /// call without changing any input.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ClockRolledBack { .. } | Self::SequenceWaitTimeout { .. }
        )
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
