//! Binary crate for the weather station.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Wiring the background loops to the HTTP control surface

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod pages;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
