//! # Tenant Resolver CLI
//!
//! This is the binary entry point for the `tenant-resolver` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging.
//! - Executing the appropriate command and translating library errors into
//!   user-friendly output.
//!
//! The resolution logic lives in the `tenant_resolver` library; the binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
