//! catalogsync command-line entry point.
//!
//! Usage:
//!   catalogsync sync prices.yml --write-back
//!   catalogsync pull prices.yml --format ts
//!   catalogsync plan prices.yml
//!   catalogsync validate prices.yml

use anyhow::Result;
use catalogsync_cli::{run, Cli};
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    run(cli).await
}
