//! # rowpipe command-line entry point
//!
//! ```bash
//! rowpipe run --spec pipeline.json --input records.json --stats
//! rowpipe validate --spec pipeline.json
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage timings on stderr.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    rowpipe::logging::init(&cli.log_level)?;
    cli::run_command(cli.command)
}
