use core::time::Duration;

use crate::{Error, IdGenerator, Layout, Result, SystemClock, TimeSource};

/// Plain settings for one generator, typically loaded from a file, the
/// environment, or command-line flags.
///
/// Node ids are signed so that negative input can be represented and
/// rejected with [`Error::InvalidConfiguration`] rather than wrapping. Every
/// field defaults to the canonical layout, node `(0, 0)`, and no wait bound.
///
/// # Example
///
/// ```
/// use flakeid::{Error, GeneratorConfig};
///
/// let config = GeneratorConfig {
///     datacenter_id: 2,
///     worker_id: 3,
///     ..GeneratorConfig::default()
/// };
/// let generator = config.build().unwrap();
/// assert_eq!(generator.worker_id(), 3);
///
/// let bad = GeneratorConfig { worker_id: -1, ..config };
/// assert!(matches!(bad.build(), Err(Error::InvalidConfiguration { .. })));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    /// Layout epoch, in milliseconds since the Unix epoch.
    pub epoch_ms: u64,
    pub datacenter_bits: u8,
    pub worker_bits: u8,
    pub sequence_bits: u8,
    pub datacenter_id: i64,
    pub worker_id: i64,
    /// Upper bound on waiting for the clock after sequence exhaustion.
    pub max_wait_ms: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let layout = Layout::CANONICAL;
        Self {
            epoch_ms: layout.epoch_ms(),
            datacenter_bits: layout.datacenter_bits() as u8,
            worker_bits: layout.worker_bits() as u8,
            sequence_bits: layout.sequence_bits() as u8,
            datacenter_id: 0,
            worker_id: 0,
            max_wait_ms: None,
        }
    }
}

impl GeneratorConfig {
    /// Builds and validates the [`Layout`] described by this config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the widths leave no
    /// timestamp bits.
    pub fn layout(&self) -> Result<Layout> {
        Layout::new(
            Duration::from_millis(self.epoch_ms),
            self.datacenter_bits,
            self.worker_bits,
            self.sequence_bits,
        )
    }

    /// Builds a generator reading the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the layout is invalid or a
    /// node id is negative or too large for its field.
    pub fn build(&self) -> Result<IdGenerator<SystemClock>> {
        self.build_with_clock(SystemClock)
    }

    /// Builds a generator reading `time`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn build_with_clock<T: TimeSource>(&self, time: T) -> Result<IdGenerator<T>> {
        let layout = self.layout()?;
        let datacenter_id = non_negative("datacenter_id", self.datacenter_id)?;
        let worker_id = non_negative("worker_id", self.worker_id)?;

        let generator = IdGenerator::with_layout(layout, datacenter_id, worker_id, time)?;
        Ok(match self.max_wait_ms {
            Some(ms) => generator.with_max_wait(Duration::from_millis(ms)),
            None => generator,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::invalid(field, format!("{value} is negative")))
}
