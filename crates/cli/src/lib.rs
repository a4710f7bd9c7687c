//! Command line front end of the balancer.
//!
//! Provides commands for:
//! - Serving the balancer's control and routing API (`serve`)
//! - Running a backend replica (`replica`)
//! - Simulating request distribution over a local ring (`simulate`)

pub mod commands;
pub mod config;
pub mod http;
pub mod telemetry;

pub use config::{BalancerConfig, CliConfig, Command};

impl CliConfig {
    pub async fn run(self) -> anyhow::Result<()> {
        self.command.run().await
    }
}
