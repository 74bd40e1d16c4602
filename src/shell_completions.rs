//! Generate shell completions.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::aot::{generate, Shell};

use super::Args;

/// Execute the `shell-completions` command.
pub fn command(shell: Shell) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_completions(shell, &mut stdout);
    stdout.flush().context("Failed to write shell completions")
}

fn write_completions<W: Write>(shell: Shell, out: &mut W) {
    generate(shell, &mut Args::command(), env!("CARGO_BIN_NAME"), out);
}
