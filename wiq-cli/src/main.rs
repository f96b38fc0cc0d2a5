//! wiq — workitem queue worker.
//!
//! # Usage
//!
//! ```text
//! wiq run --items <file.json> [--wiq <name>] [--queue <name>] [--workdir <dir>] [--once] [--log-format text|json]
//! wiq snapshot [dir] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run::RunArgs, snapshot::SnapshotArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wiq",
    version,
    about = "Drain a workitem queue, attaching the files each item produces",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker against a local queue seeded from a JSON file.
    Run(RunArgs),

    /// List the regular files the worker would see in a directory.
    Snapshot(SnapshotArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Snapshot(args) => args.run(),
    }
}
