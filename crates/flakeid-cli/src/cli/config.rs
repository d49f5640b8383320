use core::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use flakeid::{DEFAULT_EPOCH, GeneratorConfig, Layout};

/// Command-line arguments of the `flakeid` binary.
///
/// Layout and node settings are global so they can be given before or after
/// the subcommand. Each one falls back to a `FLAKEID_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeid",
    version,
    about = "Generate, decode, and inspect Snowflake-style 64-bit IDs"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Layout epoch in milliseconds since the Unix epoch.
    ///
    /// Environment variable: `FLAKEID_EPOCH_MS`
    #[arg(long, global = true, env = "FLAKEID_EPOCH_MS", default_value_t = DEFAULT_EPOCH.as_millis() as u64)]
    pub epoch_ms: u64,

    /// Width of the datacenter id field.
    ///
    /// Environment variable: `FLAKEID_DATACENTER_BITS`
    #[arg(long, global = true, env = "FLAKEID_DATACENTER_BITS", default_value_t = 5)]
    pub datacenter_bits: u8,

    /// Width of the worker id field.
    ///
    /// Environment variable: `FLAKEID_WORKER_BITS`
    #[arg(long, global = true, env = "FLAKEID_WORKER_BITS", default_value_t = 5)]
    pub worker_bits: u8,

    /// Width of the per-millisecond sequence field.
    ///
    /// Environment variable: `FLAKEID_SEQUENCE_BITS`
    #[arg(long, global = true, env = "FLAKEID_SEQUENCE_BITS", default_value_t = 12)]
    pub sequence_bits: u8,

    /// Datacenter id embedded in generated IDs.
    ///
    /// Environment variable: `FLAKEID_DATACENTER_ID`
    #[arg(
        short,
        long,
        global = true,
        env = "FLAKEID_DATACENTER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub datacenter_id: i64,

    /// Worker id embedded in generated IDs.
    ///
    /// Environment variable: `FLAKEID_WORKER_ID`
    #[arg(
        short,
        long,
        global = true,
        env = "FLAKEID_WORKER_ID",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub worker_id: i64,

    /// Give up when a millisecond is exhausted and the clock does not advance
    /// within this many milliseconds. Unbounded when unset.
    ///
    /// Environment variable: `FLAKEID_MAX_WAIT_MS`
    #[arg(long, global = true, env = "FLAKEID_MAX_WAIT_MS")]
    pub max_wait_ms: Option<u64>,

    /// Sleep out and retry a clock rollback of at most this many
    /// milliseconds. Larger rollbacks fail the command.
    ///
    /// Environment variable: `FLAKEID_MAX_ROLLBACK_WAIT_MS`
    #[arg(long, global = true, env = "FLAKEID_MAX_ROLLBACK_WAIT_MS", default_value_t = 0)]
    pub max_rollback_wait_ms: u64,

    /// Output format.
    ///
    /// Environment variable: `FLAKEID_FORMAT`
    #[arg(long, global = true, env = "FLAKEID_FORMAT", value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print newly generated IDs, one per line.
    Generate {
        /// Number of IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Split IDs into timestamp, datacenter, worker, and sequence.
    Decode {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Print the bit layout and its capacity.
    Inspect,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Validated settings derived from [`CliArgs`].
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub command: Command,
    pub generator: GeneratorConfig,
    pub layout: Layout,
    pub max_rollback_wait: Duration,
    pub format: Format,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if let Command::Generate { count: 0 } = args.command {
            bail!("--count must be greater than 0");
        }

        let generator = GeneratorConfig {
            epoch_ms: args.epoch_ms,
            datacenter_bits: args.datacenter_bits,
            worker_bits: args.worker_bits,
            sequence_bits: args.sequence_bits,
            datacenter_id: args.datacenter_id,
            worker_id: args.worker_id,
            max_wait_ms: args.max_wait_ms,
        };
        let layout = generator.layout().context("invalid ID layout")?;
        // Node ids only matter when generating.
        if matches!(args.command, Command::Generate { .. }) {
            generator
                .build()
                .context("invalid generator configuration")?;
        }

        Ok(Self {
            command: args.command,
            generator,
            layout,
            max_rollback_wait: Duration::from_millis(args.max_rollback_wait_ms),
            format: args.format,
        })
    }
}
