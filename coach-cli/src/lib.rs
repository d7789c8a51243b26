//! Library half of the `coach` binary: subcommand bodies shared by `main` and its tests.

pub mod commands;

pub use commands::{CheckRules, CliError, Report};
