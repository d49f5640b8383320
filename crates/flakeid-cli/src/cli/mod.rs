//! Building blocks of the `flakeid` binary.
//!
//! - [`config`] - argument parsing and validation
//! - [`output`] - the subcommands, written against any [`std::io::Write`]
//! - [`telemetry`] - stderr logging

pub mod config;
pub mod output;
pub mod telemetry;
