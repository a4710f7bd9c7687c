//! Command line arguments and the balancer's TOML configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use balancer::DockerSettings;
use clap::{Parser, Subcommand};
use serde::Deserialize;

/// Consistent-hash load balancer.
#[derive(Parser, Debug)]
#[command(name = "balancer", version, about = "Consistent-hash request balancer")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the balancer: control API plus request routing.
    Serve {
        /// Path to the TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen address; overrides `listen` from the file.
        #[arg(long)]
        listen: Option<String>,
    },

    /// Run a backend replica serving `/home` and `/heartbeat`.
    Replica {
        /// Identity reported in `/home` responses.
        #[arg(long, env = "SERVER_ID")]
        id: String,

        #[arg(long, default_value = "0.0.0.0:5000")]
        listen: String,
    },

    /// Route random keys through a local ring and print the spread.
    Simulate {
        #[arg(long, default_value_t = 3)]
        servers: u64,

        #[arg(long, default_value_t = 10_000)]
        requests: u32,

        #[arg(long, default_value_t = corelib::ring::DEFAULT_SLOTS)]
        slots: u32,

        /// Virtual nodes per server; defaults to log2(slots).
        #[arg(long)]
        vnodes: Option<u32>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Balancer configuration. Every field has a default, so an empty file
/// (or no file) is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BalancerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ring slot count M.
    #[serde(default = "default_slots")]
    pub slots: u32,

    /// Virtual nodes per replica K; log2(M) when unset.
    #[serde(default)]
    pub vnodes: Option<u32>,

    #[serde(default = "default_proxy_timeout_ms")]
    pub proxy_timeout_ms: u64,

    /// Paths forwarded to replicas.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Replicas provisioned at startup.
    #[serde(default = "default_initial_replicas")]
    pub initial_replicas: Vec<String>,

    /// Prefix of synthesized replica names.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    #[serde(default)]
    pub provisioner: ProvisionerConfig,
}

/// How replicas are started and stopped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProvisionerConfig {
    /// Replicas are run by something else and reachable by name.
    Static {
        #[serde(default = "default_address_template")]
        address_template: String,
    },
    /// Replicas are containers started through the docker CLI.
    Docker {
        #[serde(default = "default_image")]
        image: String,
        #[serde(default = "default_network")]
        network: String,
        #[serde(default = "default_replica_port")]
        port: u16,
        #[serde(default = "default_ready_timeout_ms")]
        ready_timeout_ms: u64,
    },
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_slots() -> u32 {
    corelib::ring::DEFAULT_SLOTS
}

fn default_proxy_timeout_ms() -> u64 {
    3_000
}

fn default_endpoints() -> Vec<String> {
    vec!["home".to_string()]
}

fn default_initial_replicas() -> Vec<String> {
    vec!["S1".to_string(), "S2".to_string(), "S3".to_string()]
}

fn default_name_prefix() -> String {
    "S".to_string()
}

fn default_address_template() -> String {
    balancer::provisioner::static_hosts::DEFAULT_ADDRESS_TEMPLATE.to_string()
}

fn default_image() -> String {
    DockerSettings::default().image
}

fn default_network() -> String {
    DockerSettings::default().network
}

fn default_replica_port() -> u16 {
    DockerSettings::default().port
}

fn default_ready_timeout_ms() -> u64 {
    20_000
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        ProvisionerConfig::Static {
            address_template: default_address_template(),
        }
    }
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            slots: default_slots(),
            vnodes: None,
            proxy_timeout_ms: default_proxy_timeout_ms(),
            endpoints: default_endpoints(),
            initial_replicas: default_initial_replicas(),
            name_prefix: default_name_prefix(),
            provisioner: ProvisionerConfig::default(),
        }
    }
}

impl BalancerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }
}

impl ProvisionerConfig {
    pub fn docker_settings(&self) -> Option<DockerSettings> {
        match self {
            ProvisionerConfig::Docker {
                image,
                network,
                port,
                ready_timeout_ms,
            } => Some(DockerSettings {
                image: image.clone(),
                network: network.clone(),
                port: *port,
                ready_timeout: Duration::from_millis(*ready_timeout_ms),
                ..DockerSettings::default()
            }),
            ProvisionerConfig::Static { .. } => None,
        }
    }
}
