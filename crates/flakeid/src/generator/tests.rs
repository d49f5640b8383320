use core::time::Duration;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread::scope,
    vec::Vec,
};

use crate::{
    DEFAULT_EPOCH, Error, GeneratorState, IdGenStatus, IdGenerator, Layout, MonotonicClock,
    SystemClock, TimeSource,
};

const EPOCH: u64 = DEFAULT_EPOCH.as_millis() as u64;

/// A clock that stays where it is put.
#[derive(Clone, Debug, Default)]
struct MockTime {
    millis: Arc<AtomicU64>,
}

impl MockTime {
    fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Reads `first` for the first `switch_after` readings, `then` afterwards.
#[derive(Debug)]
struct StepTime {
    first: u64,
    then: u64,
    switch_after: usize,
    reads: AtomicUsize,
}

impl StepTime {
    fn new(first: u64, then: u64, switch_after: usize) -> Self {
        Self {
            first,
            then,
            switch_after,
            reads: AtomicUsize::new(0),
        }
    }
}

impl TimeSource for StepTime {
    fn current_millis(&self) -> u64 {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.switch_after {
            self.first
        } else {
            self.then
        }
    }
}

trait IdGenStatusExt {
    fn unwrap_ready(self) -> u64;
    fn unwrap_pending(self) -> u64;
}

impl IdGenStatusExt for IdGenStatus {
    fn unwrap_ready(self) -> u64 {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn mock_generator(datacenter_id: u64, worker_id: u64, clock: MockTime) -> IdGenerator<MockTime> {
    IdGenerator::with_layout(Layout::CANONICAL, datacenter_id, worker_id, clock).unwrap()
}

#[test]
fn first_id_matches_documented_encoding() {
    let generator = mock_generator(2, 3, MockTime::at(EPOCH + 100));
    let id = generator.generate().unwrap();
    assert_eq!(id, (100 << 22) | (2 << 17) | (3 << 12));
}

#[test]
fn sequence_increments_within_same_millisecond() {
    let generator = mock_generator(1, 1, MockTime::at(EPOCH + 42));

    let id1 = generator.generate().unwrap();
    let id2 = generator.generate().unwrap();
    let id3 = generator.generate().unwrap();

    for (id, sequence) in [(id1, 0), (id2, 1), (id3, 2)] {
        let parts = generator.decode(id);
        assert_eq!(parts.timestamp_ms, EPOCH + 42);
        assert_eq!(parts.sequence, sequence);
    }
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn sequence_resets_when_millisecond_advances() {
    let clock = MockTime::at(EPOCH + 42);
    let generator = mock_generator(0, 0, clock.clone());

    generator.generate().unwrap();
    let before = generator.generate().unwrap();
    assert_eq!(generator.decode(before).sequence, 1);

    clock.set(EPOCH + 43);
    let after = generator.generate().unwrap();
    assert_eq!(generator.decode(after).sequence, 0);
    assert_eq!(generator.decode(after).timestamp_ms, EPOCH + 43);
    assert!(after > before);
}

#[test]
fn exhausted_sequence_waits_for_next_millisecond() {
    let layout = Layout::CANONICAL;
    let per_ms = layout.ids_per_millisecond();
    // One extra reading at +42 makes the final call observe exhaustion first.
    let clock = Arc::new(StepTime::new(EPOCH + 42, EPOCH + 43, per_ms as usize + 1));
    let generator = IdGenerator::with_layout(layout, 1, 1, Arc::clone(&clock)).unwrap();

    let mut last = 0;
    for expected in 0..per_ms {
        let id = generator.generate().unwrap();
        let parts = generator.decode(id);
        assert_eq!(parts.sequence, expected);
        assert_eq!(parts.timestamp_ms, EPOCH + 42);
        assert!(id > last || expected == 0);
        last = id;
    }

    let id = generator.generate().unwrap();
    let parts = generator.decode(id);
    assert_eq!(parts.timestamp_ms, EPOCH + 43);
    assert_eq!(parts.sequence, 0);
    assert!(id > last);
    assert!(clock.reads.load(Ordering::SeqCst) > per_ms as usize + 1);
}

#[test]
fn exhausted_sequence_reports_pending_without_mutation() {
    let generator = mock_generator(0, 0, MockTime::at(EPOCH + 42));
    for _ in 0..Layout::CANONICAL.ids_per_millisecond() {
        generator.try_poll_id().unwrap().unwrap_ready();
    }
    let before = generator.state().unwrap();
    assert_eq!(before.last_timestamp(), Some(42));
    assert_eq!(before.sequence(), 4095);

    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
    assert_eq!(generator.state().unwrap(), before);
}

#[test]
fn generate_with_backs_off_until_clock_advances() {
    let clock = MockTime::at(EPOCH + 7);
    let generator = mock_generator(0, 0, clock.clone());
    for _ in 0..Layout::CANONICAL.ids_per_millisecond() {
        generator.generate().unwrap();
    }

    let mut backoffs = Vec::new();
    let id = generator
        .generate_with(|yield_for| {
            backoffs.push(yield_for);
            clock.set(EPOCH + 8);
        })
        .unwrap();

    assert_eq!(backoffs, [1]);
    assert_eq!(generator.decode(id).timestamp_ms, EPOCH + 8);
    assert_eq!(generator.decode(id).sequence, 0);
}

#[test]
fn clock_rollback_is_reported_and_state_preserved() {
    let clock = MockTime::at(EPOCH + 1_000);
    let generator = mock_generator(0, 0, clock.clone());
    generator.generate().unwrap();
    let before = generator.state().unwrap();

    clock.set(EPOCH + 995);
    let err = generator.generate().unwrap_err();
    assert_eq!(err, Error::ClockRolledBack { rollback_ms: 5 });
    assert!(err.is_retryable());
    assert_eq!(generator.state().unwrap(), before);

    // Once the clock catches up, generation continues where it left off.
    clock.set(EPOCH + 1_000);
    let id = generator.generate().unwrap();
    assert_eq!(generator.decode(id).sequence, 1);
}

#[test]
fn max_node_ids_are_accepted() {
    let layout = Layout::CANONICAL;
    let generator = IdGenerator::new(layout.max_datacenter_id(), layout.max_worker_id()).unwrap();
    let parts = generator.decode(generator.generate().unwrap());
    assert_eq!(parts.datacenter_id, 31);
    assert_eq!(parts.worker_id, 31);
}

#[test]
fn out_of_range_node_ids_are_rejected() {
    let layout = Layout::CANONICAL;
    assert!(matches!(
        IdGenerator::new(layout.max_datacenter_id() + 1, 0),
        Err(Error::InvalidConfiguration {
            field: "datacenter_id",
            ..
        })
    ));
    assert!(matches!(
        IdGenerator::new(0, layout.max_worker_id() + 1),
        Err(Error::InvalidConfiguration {
            field: "worker_id",
            ..
        })
    ));
}

#[test]
fn new_generator_state_is_unset() {
    let generator = mock_generator(0, 0, MockTime::at(EPOCH));
    assert_eq!(generator.state().unwrap(), GeneratorState::new());
    assert_eq!(generator.max_wait(), None);
}

#[test]
fn wait_timeout_surfaces_as_transient_error() {
    let generator =
        mock_generator(0, 0, MockTime::at(EPOCH + 3)).with_max_wait(Duration::from_millis(2));
    for _ in 0..Layout::CANONICAL.ids_per_millisecond() {
        generator.generate().unwrap();
    }
    let before = generator.state().unwrap();

    let err = generator.generate().unwrap_err();
    match err {
        Error::SequenceWaitTimeout { waited } => assert!(waited > Duration::from_millis(2)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(generator.state().unwrap(), before);
}

#[test]
fn clock_before_epoch_is_rejected() {
    let generator = mock_generator(0, 0, MockTime::at(EPOCH - 1));
    assert_eq!(
        generator.generate(),
        Err(Error::ClockBeforeEpoch {
            now_ms: EPOCH - 1,
            epoch_ms: EPOCH
        })
    );
    assert_eq!(generator.state().unwrap(), GeneratorState::new());
}

#[test]
fn rollback_below_epoch_is_a_rollback() {
    let clock = MockTime::at(EPOCH + 3);
    let generator = mock_generator(0, 0, clock.clone());
    generator.generate().unwrap();
    let before = generator.state().unwrap();

    clock.set(EPOCH - 7);
    let err = generator.generate().unwrap_err();
    assert_eq!(err, Error::ClockRolledBack { rollback_ms: 10 });
    assert!(err.is_retryable());
    assert_eq!(generator.state().unwrap(), before);

    clock.set(EPOCH + 4);
    let id = generator.generate().unwrap();
    assert_eq!(generator.decode(id).timestamp_ms, EPOCH + 4);
}

#[test]
fn timestamp_overflow_is_rejected() {
    // 20 + 20 + 22 bits leave a single timestamp bit.
    let layout = Layout::new(DEFAULT_EPOCH, 20, 20, 22).unwrap();
    let clock = MockTime::at(EPOCH + 1);
    let generator = IdGenerator::with_layout(layout, 0, 0, clock.clone()).unwrap();
    generator.generate().unwrap();

    clock.set(EPOCH + 2);
    assert_eq!(
        generator.generate(),
        Err(Error::TimestampOverflow {
            elapsed_ms: 2,
            max_ms: 1
        })
    );
}

#[test]
fn clones_share_state() {
    let generator = mock_generator(0, 0, MockTime::at(EPOCH + 9));
    let clone = generator.clone();

    let a = generator.generate().unwrap();
    let b = clone.generate().unwrap();
    assert_eq!(generator.decode(a).sequence, 0);
    assert_eq!(clone.decode(b).sequence, 1);
    assert_eq!(generator.state().unwrap(), clone.state().unwrap());
}

#[test]
fn decode_recovers_node_and_time() {
    let generator = IdGenerator::new(7, 19).unwrap();

    let before = SystemClock.current_millis();
    let id = generator.generate().unwrap();
    let after = SystemClock.current_millis();

    let parts = generator.decode(id);
    assert_eq!(parts.datacenter_id, 7);
    assert_eq!(parts.worker_id, 19);
    assert!(before <= parts.timestamp_ms && parts.timestamp_ms <= after);
    assert!(generator.layout().is_valid(id));
}

#[test]
fn sequential_ids_are_unique_and_increasing() {
    const TOTAL_IDS: usize = 4096 * 64;

    let generator =
        IdGenerator::with_layout(Layout::CANONICAL, 1, 2, MonotonicClock::default()).unwrap();
    let mut last_timestamp = 0;
    let mut expected_sequence = 0;
    let mut last_id = None;

    for _ in 0..TOTAL_IDS {
        let id = generator.generate().unwrap();
        let parts = generator.decode(id);
        if parts.timestamp_ms > last_timestamp {
            expected_sequence = 0;
        }

        assert!(parts.timestamp_ms >= last_timestamp);
        assert_eq!(parts.datacenter_id, 1);
        assert_eq!(parts.worker_id, 2);
        assert_eq!(parts.sequence, expected_sequence);
        assert!(last_id.is_none_or(|last| id > last));

        last_timestamp = parts.timestamp_ms;
        expected_sequence += 1;
        last_id = Some(id);
    }
}

#[test]
fn threaded_ids_are_unique() {
    const IDS_PER_THREAD: usize = 4096 * 16;
    let threads = num_cpus::get().max(2);

    let generator =
        IdGenerator::with_layout(Layout::CANONICAL, 3, 4, MonotonicClock::default()).unwrap();

    let batches: Vec<Vec<u64>> = scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let generator = generator.clone();
                s.spawn(move || {
                    let mut ids = Vec::with_capacity(IDS_PER_THREAD);
                    for _ in 0..IDS_PER_THREAD {
                        ids.push(generator.generate().unwrap());
                    }
                    ids
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let total = threads * IDS_PER_THREAD;
    let mut ids = HashSet::with_capacity(total);
    let mut pairs = HashSet::with_capacity(total);
    for batch in &batches {
        // Generation is serialized, so each caller observes increasing IDs.
        assert!(batch.windows(2).all(|w| w[0] < w[1]));
        for &id in batch {
            let parts = generator.decode(id);
            assert!(ids.insert(id));
            assert!(pairs.insert((parts.timestamp_ms, parts.sequence)));
        }
    }
    assert_eq!(ids.len(), total, "Expected {total} unique IDs");
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn panicking_clock_poisons_the_lock() {
    use std::sync::atomic::AtomicBool;

    #[derive(Debug, Default)]
    struct PanicOnce {
        panicked: AtomicBool,
    }

    impl TimeSource for PanicOnce {
        fn current_millis(&self) -> u64 {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("clock failure");
            }
            EPOCH
        }
    }

    let generator =
        IdGenerator::with_layout(Layout::CANONICAL, 0, 0, PanicOnce::default()).unwrap();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| generator.generate()));
    assert!(result.is_err());
    assert_eq!(generator.generate(), Err(Error::LockPoisoned));
}
