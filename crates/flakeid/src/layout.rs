use core::{fmt, time::Duration};

use crate::{DEFAULT_EPOCH, Error, Result};

/// Total number of usable bits; the most significant bit stays clear so IDs
/// remain non-negative as signed 64-bit integers.
const USABLE_BITS: u32 = 63;

/// The bit partition of a 64-bit identifier plus the epoch its timestamp is
/// measured from.
///
/// Every generator that must interoperate has to share one `Layout` value.
///
/// The canonical layout:
///
/// ```text
///  Bit Index:  63           63 62            22 21              17 16          12 11             0
///              +--------------+----------------+------------------+--------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter ID (5)| worker ID (5)| sequence (12) |
///              +--------------+----------------+------------------+--------------+---------------+
///              |<------------------- MSB ------------- 64 bits ------------- LSB ---------------->|
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    epoch_ms: u64,
    datacenter_bits: u8,
    worker_bits: u8,
    sequence_bits: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl Layout {
    /// 5 datacenter bits, 5 worker bits and 12 sequence bits, leaving 41
    /// timestamp bits measured from [`DEFAULT_EPOCH`].
    pub const CANONICAL: Self = Self {
        epoch_ms: DEFAULT_EPOCH.as_millis() as u64,
        datacenter_bits: 5,
        worker_bits: 5,
        sequence_bits: 12,
    };

    /// Builds a layout from an epoch and the widths of the node and sequence
    /// fields. The timestamp receives the remaining bits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the widths leave no bit for
    /// the timestamp or the epoch does not fit in 64-bit milliseconds.
    ///
    /// # Example
    ///
    /// ```
    /// use flakeid::{Layout, TWITTER_EPOCH};
    ///
    /// let layout = Layout::new(TWITTER_EPOCH, 5, 5, 12).unwrap();
    /// assert_eq!(layout.timestamp_bits(), 41);
    /// assert_eq!(layout.timestamp_shift(), 22);
    ///
    /// assert!(Layout::new(TWITTER_EPOCH, 21, 21, 21).is_err());
    /// ```
    pub fn new(
        epoch: Duration,
        datacenter_bits: u8,
        worker_bits: u8,
        sequence_bits: u8,
    ) -> Result<Self> {
        let epoch_ms = u64::try_from(epoch.as_millis())
            .map_err(|_| Error::invalid("epoch_ms", "epoch does not fit in u64 milliseconds"))?;
        let used = u32::from(datacenter_bits) + u32::from(worker_bits) + u32::from(sequence_bits);
        if used >= USABLE_BITS {
            return Err(Error::invalid(
                "layout",
                format!(
                    "datacenter ({datacenter_bits}) + worker ({worker_bits}) + sequence \
                     ({sequence_bits}) bits = {used} leaves no timestamp bits out of {USABLE_BITS}"
                ),
            ));
        }
        Ok(Self {
            epoch_ms,
            datacenter_bits,
            worker_bits,
            sequence_bits,
        })
    }

    /// The epoch, in milliseconds since the Unix epoch.
    pub const fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_ms)
    }

    pub const fn datacenter_bits(&self) -> u32 {
        self.datacenter_bits as u32
    }

    pub const fn worker_bits(&self) -> u32 {
        self.worker_bits as u32
    }

    pub const fn sequence_bits(&self) -> u32 {
        self.sequence_bits as u32
    }

    pub const fn timestamp_bits(&self) -> u32 {
        USABLE_BITS - self.timestamp_shift()
    }

    pub const fn worker_shift(&self) -> u32 {
        self.sequence_bits()
    }

    pub const fn datacenter_shift(&self) -> u32 {
        self.sequence_bits() + self.worker_bits()
    }

    pub const fn timestamp_shift(&self) -> u32 {
        self.sequence_bits() + self.worker_bits() + self.datacenter_bits()
    }

    pub const fn max_datacenter_id(&self) -> u64 {
        mask(self.datacenter_bits())
    }

    pub const fn max_worker_id(&self) -> u64 {
        mask(self.worker_bits())
    }

    pub const fn max_sequence(&self) -> u64 {
        mask(self.sequence_bits())
    }

    /// Largest epoch-relative millisecond the timestamp field can hold.
    pub const fn max_timestamp(&self) -> u64 {
        mask(self.timestamp_bits())
    }

    /// IDs a single node can issue within one millisecond.
    pub const fn ids_per_millisecond(&self) -> u64 {
        self.max_sequence() + 1
    }

    /// Distinct `(datacenter_id, worker_id)` pairs the layout can address.
    pub const fn max_nodes(&self) -> u64 {
        (self.max_datacenter_id() + 1) * (self.max_worker_id() + 1)
    }

    /// Span of time, starting at the epoch, the timestamp field can
    /// represent.
    pub const fn lifetime(&self) -> Duration {
        Duration::from_millis(self.max_timestamp()).saturating_add(Duration::from_millis(1))
    }

    /// Packs the four fields into an identifier. `timestamp` is relative to
    /// the epoch. Each field is masked to its width.
    pub const fn compose(
        &self,
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> u64 {
        ((timestamp & self.max_timestamp()) << self.timestamp_shift())
            | ((datacenter_id & self.max_datacenter_id()) << self.datacenter_shift())
            | ((worker_id & self.max_worker_id()) << self.worker_shift())
            | (sequence & self.max_sequence())
    }

    /// Splits an identifier into its fields.
    ///
    /// Any 64-bit value decodes; `0` decodes to the epoch with zero fields.
    /// The timestamp is masked to its field, so the reserved top bit is
    /// dropped rather than added to `timestamp_ms`. Check [`Self::is_valid`]
    /// to detect such IDs.
    ///
    /// # Example
    ///
    /// ```
    /// use flakeid::Layout;
    ///
    /// let layout = Layout::CANONICAL;
    /// let id = (100 << 22) | (2 << 17) | (3 << 12) | 7;
    /// let parts = layout.decode(id);
    ///
    /// assert_eq!(parts.timestamp_ms, layout.epoch_ms() + 100);
    /// assert_eq!(parts.datacenter_id, 2);
    /// assert_eq!(parts.worker_id, 3);
    /// assert_eq!(parts.sequence, 7);
    /// ```
    pub const fn decode(&self, id: u64) -> DecodedId {
        let elapsed = (id >> self.timestamp_shift()) & self.max_timestamp();
        DecodedId {
            timestamp_ms: elapsed.saturating_add(self.epoch_ms),
            datacenter_id: (id >> self.datacenter_shift()) & self.max_datacenter_id(),
            worker_id: (id >> self.worker_shift()) & self.max_worker_id(),
            sequence: id & self.max_sequence(),
        }
    }

    /// Returns `true` if the reserved top bit is clear.
    pub const fn is_valid(&self, id: u64) -> bool {
        id >> USABLE_BITS == 0
    }

    pub(crate) fn check_node(&self, datacenter_id: u64, worker_id: u64) -> Result<()> {
        if datacenter_id > self.max_datacenter_id() {
            return Err(Error::invalid(
                "datacenter_id",
                format!(
                    "{datacenter_id} exceeds the maximum of {}",
                    self.max_datacenter_id()
                ),
            ));
        }
        if worker_id > self.max_worker_id() {
            return Err(Error::invalid(
                "worker_id",
                format!("{worker_id} exceeds the maximum of {}", self.max_worker_id()),
            ));
        }
        Ok(())
    }
}

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

/// The fields of a decoded identifier.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecodedId {
    /// Milliseconds since the Unix epoch (the layout epoch is added back).
    pub timestamp_ms: u64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

impl fmt::Display for DecodedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp_ms={} datacenter_id={} worker_id={} sequence={}",
            self.timestamp_ms, self.datacenter_id, self.worker_id, self.sequence
        )
    }
}
