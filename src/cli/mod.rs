//! CLI module
//!
//! Command-line interface for running the job. There are no subcommands:
//! one invocation runs the selected pipelines end to end.

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
