/// The outcome of a single, non-blocking generation attempt.
///
/// Returned by [`IdGenerator::try_poll_id`]. Callers that cannot block (event
/// loops, async tasks) use it to decide how to back off; the blocking
/// [`IdGenerator::generate`] loops over it internally.
///
/// # Example
///
/// ```
/// use flakeid::{IdGenStatus, IdGenerator};
///
/// let generator = IdGenerator::new(1, 1).unwrap();
/// let id = loop {
///     match generator.try_poll_id().unwrap() {
///         IdGenStatus::Ready { id } => break id,
///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
///     }
/// };
/// assert_eq!(generator.decode(id).worker_id, 1);
/// ```
///
/// [`IdGenerator::try_poll_id`]: crate::IdGenerator::try_poll_id
/// [`IdGenerator::generate`]: crate::IdGenerator::generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The encoded identifier.
        id: u64,
    },
    /// The sequence is exhausted for the current millisecond.
    ///
    /// Retry once the clock has advanced.
    Pending {
        /// Milliseconds to wait before the next attempt can succeed.
        yield_for: u64,
    },
}
