//! prepflow: leakage-free preprocessing CLI
//!
//! Fits preprocessing recipes on training data, applies them to new data and
//! cross-validates them together with a regression model.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prepflow::cli::{run_bake, run_validate, Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Bake(args) => run_bake(args),
        Commands::Validate(args) => run_validate(args),
    }
}
