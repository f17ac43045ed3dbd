//! # CLI Command Implementations
//!
//! Each subcommand of `tenant-resolver` lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `tenant_resolver` library.

pub mod completions;
pub mod resolve;
pub mod status;
