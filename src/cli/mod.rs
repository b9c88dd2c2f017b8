//! CLI module for stoploop - command-line interface and subcommands.
//!
//! Provides the start/hook/status/cancel subcommands.

pub mod commands;

pub use commands::Cli;
