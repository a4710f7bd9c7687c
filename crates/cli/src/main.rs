//! `balancer` entry point.

use clap::Parser;
use cli::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    CliConfig::parse().run().await
}
