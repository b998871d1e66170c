//! Output rendering shared by the subcommands.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// Output format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Styled, human-readable output.
    Pretty,
    /// One JSON document per command on stdout.
    Json,
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
