use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = ezelect_cli::Cli::parse();
    cli.run()
}
