#![doc = include_str!("../README.md")]

mod cli;

use std::io::{BufWriter, Write};

use clap::Parser;
use cli::config::{CliArgs, CliConfig};
use cli::output::run;
use cli::telemetry::init_telemetry;

// mimalloc keeps allocation cheap for large `generate --count` batches.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    tracing::debug!(?config, "resolved configuration");

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run(&config, &mut out)?;
    out.flush()?;
    Ok(())
}
