//! RubyLens CLI entrypoint

use anyhow::Result;
use clap::Parser;

use rubylens::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.execute()
}
