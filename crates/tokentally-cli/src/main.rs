mod commands;
mod logging;
mod persist;
mod probe;

use clap::Parser;
use commands::Commands;

/// tokentally-cli
#[derive(clap::Parser, Debug)]
#[command(name = "tokentally", version, about)]
pub struct Args {
    /// Subcommand to run.
    #[clap(subcommand)]
    pub command: Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    args.command.run()
}
