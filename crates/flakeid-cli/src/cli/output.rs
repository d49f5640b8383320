use core::time::Duration;
use std::io::Write;

use anyhow::Context;
use flakeid::{DecodedId, Error, IdGenerator, Layout, TimeSource};
use serde::Serialize;

use super::config::{CliConfig, Command, Format};

/// Runs the configured subcommand, writing its output to `out`.
pub fn run(config: &CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Generate { count } => {
            let generator = config.generator.build()?;
            generate_ids(&generator, *count, config.max_rollback_wait, config.format, out)
        }
        Command::Decode { ids } => decode_ids(&config.layout, ids, config.format, out),
        Command::Inspect => inspect(&config.layout, config.format, out),
    }
}

/// Writes `count` IDs, one per line in text mode or as one JSON array.
pub fn generate_ids<T: TimeSource>(
    generator: &IdGenerator<T>,
    count: usize,
    max_rollback_wait: Duration,
    format: Format,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match format {
        Format::Text => {
            for _ in 0..count {
                writeln!(out, "{}", next_id(generator, max_rollback_wait)?)?;
            }
        }
        Format::Json => {
            let ids = (0..count)
                .map(|_| next_id(generator, max_rollback_wait))
                .collect::<anyhow::Result<Vec<_>>>()?;
            serde_json::to_writer(&mut *out, &ids)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Generates one ID, sleeping out clock rollbacks no larger than
/// `max_rollback_wait`.
fn next_id<T: TimeSource>(
    generator: &IdGenerator<T>,
    max_rollback_wait: Duration,
) -> anyhow::Result<u64> {
    loop {
        match generator.generate() {
            Ok(id) => return Ok(id),
            Err(Error::ClockRolledBack { rollback_ms })
                if Duration::from_millis(rollback_ms) <= max_rollback_wait =>
            {
                tracing::warn!(rollback_ms, "clock moved backwards, waiting before retrying");
                std::thread::sleep(Duration::from_millis(rollback_ms));
            }
            Err(e) => return Err(e).context("failed to generate an ID"),
        }
    }
}

#[derive(Serialize)]
struct DecodedRow {
    id: u64,
    #[serde(flatten)]
    parts: DecodedId,
    valid: bool,
}

/// Writes the fields of each ID. IDs with the reserved bit set are still
/// decoded but flagged.
pub fn decode_ids(
    layout: &Layout,
    ids: &[u64],
    format: Format,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let rows = ids.iter().map(|&id| DecodedRow {
        id,
        parts: layout.decode(id),
        valid: layout.is_valid(id),
    });

    match format {
        Format::Text => {
            for row in rows {
                write!(out, "{} {}", row.id, row.parts)?;
                if !row.valid {
                    write!(out, " (reserved bit set)")?;
                }
                writeln!(out)?;
            }
        }
        Format::Json => {
            serde_json::to_writer(&mut *out, &rows.collect::<Vec<_>>())?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct LayoutReport {
    epoch_ms: u64,
    timestamp_bits: u32,
    timestamp_shift: u32,
    datacenter_bits: u32,
    datacenter_shift: u32,
    max_datacenter_id: u64,
    worker_bits: u32,
    worker_shift: u32,
    max_worker_id: u64,
    sequence_bits: u32,
    max_sequence: u64,
    ids_per_millisecond: u64,
    max_nodes: u64,
    lifetime_days: u64,
}

impl From<&Layout> for LayoutReport {
    fn from(layout: &Layout) -> Self {
        Self {
            epoch_ms: layout.epoch_ms(),
            timestamp_bits: layout.timestamp_bits(),
            timestamp_shift: layout.timestamp_shift(),
            datacenter_bits: layout.datacenter_bits(),
            datacenter_shift: layout.datacenter_shift(),
            max_datacenter_id: layout.max_datacenter_id(),
            worker_bits: layout.worker_bits(),
            worker_shift: layout.worker_shift(),
            max_worker_id: layout.max_worker_id(),
            sequence_bits: layout.sequence_bits(),
            max_sequence: layout.max_sequence(),
            ids_per_millisecond: layout.ids_per_millisecond(),
            max_nodes: layout.max_nodes(),
            lifetime_days: layout.lifetime().as_secs() / 86_400,
        }
    }
}

/// Writes the layout's widths, shifts, and capacity.
pub fn inspect(layout: &Layout, format: Format, out: &mut impl Write) -> anyhow::Result<()> {
    let report = LayoutReport::from(layout);
    match format {
        Format::Text => {
            let r = &report;
            writeln!(out, "epoch_ms            {}", r.epoch_ms)?;
            writeln!(out, "timestamp           {} bits, shift {}", r.timestamp_bits, r.timestamp_shift)?;
            writeln!(
                out,
                "datacenter_id       {} bits, shift {}, max {}",
                r.datacenter_bits, r.datacenter_shift, r.max_datacenter_id
            )?;
            writeln!(
                out,
                "worker_id           {} bits, shift {}, max {}",
                r.worker_bits, r.worker_shift, r.max_worker_id
            )?;
            writeln!(out, "sequence            {} bits, max {}", r.sequence_bits, r.max_sequence)?;
            writeln!(out, "ids_per_millisecond {}", r.ids_per_millisecond)?;
            writeln!(out, "max_nodes           {}", r.max_nodes)?;
            writeln!(out, "lifetime_days       {}", r.lifetime_days)?;
        }
        Format::Json => {
            serde_json::to_writer(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
