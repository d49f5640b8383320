use core::cmp::Ordering;

use crate::{Error, Result};

/// The mutable half of a generator: the last millisecond an ID was issued for
/// and the sequence counter within it.
///
/// Timestamps here are relative to the layout epoch. The value is advanced by
/// a single transition function while the generator lock is held, and can be
/// inspected through [`IdGenerator::state`].
///
/// [`IdGenerator::state`]: crate::IdGenerator::state
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// Result of feeding one clock reading into [`GeneratorState::advance`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Emit an ID for the reading with this sequence number.
    Issued { sequence: u64 },
    /// Every sequence number of the reading's millisecond is taken.
    Exhausted,
}

impl GeneratorState {
    /// A state that has not issued any ID yet.
    pub const fn new() -> Self {
        Self {
            last_timestamp: None,
            sequence: 0,
        }
    }

    /// The epoch-relative millisecond of the last issued ID, if any.
    pub const fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    /// The sequence number of the last issued ID.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Reconciles an epoch-relative clock reading with the state.
    ///
    /// Nothing is mutated when the reading is behind `last_timestamp` or the
    /// sequence is exhausted.
    pub(crate) fn advance(&mut self, now: u64, max_sequence: u64) -> Result<Tick> {
        let Some(last) = self.last_timestamp else {
            return Ok(self.rollover_to(now));
        };

        match now.cmp(&last) {
            Ordering::Equal => {
                if self.sequence < max_sequence {
                    self.sequence += 1;
                    Ok(Tick::Issued {
                        sequence: self.sequence,
                    })
                } else {
                    Ok(Tick::Exhausted)
                }
            }
            Ordering::Greater => Ok(self.rollover_to(now)),
            Ordering::Less => Err(Self::clock_behind(last - now, last)),
        }
    }

    fn rollover_to(&mut self, now: u64) -> Tick {
        self.last_timestamp = Some(now);
        self.sequence = 0;
        Tick::Issued { sequence: 0 }
    }

    /// The error for a reading `rollback_ms` behind `last`, which may also
    /// lie before the epoch.
    #[cold]
    #[inline(never)]
    pub(crate) fn clock_behind(rollback_ms: u64, last: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(rollback_ms, last_timestamp = last, "clock moved backwards");
        Error::ClockRolledBack { rollback_ms }
    }
}
