//! Docker-backed provisioner.
//!
//! Each replica is a container named after the replica, attached to a user
//! network with the replica name as its network alias, so the balancer can
//! reach it at `http://{name}:{port}`. Readiness is confirmed by polling the
//! replica's `/heartbeat` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{ProvisionError, Provisioner};

/// Settings for [`DockerProvisioner`].
#[derive(Debug, Clone)]
pub struct DockerSettings {
    /// Replica image; it must serve `/home` and `/heartbeat` on `port`.
    pub image: String,
    /// User-defined docker network shared with the balancer.
    pub network: String,
    pub port: u16,
    /// How long `start` waits for the heartbeat before giving up.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            image: "slotring-replica".to_string(),
            network: "net1".to_string(),
            port: 5000,
            ready_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Starts replicas as containers through the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerProvisioner {
    settings: DockerSettings,
    client: reqwest::Client,
}

impl DockerProvisioner {
    pub fn new(settings: DockerSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.poll_interval.max(Duration::from_millis(500)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { settings, client }
    }

    fn address_of(&self, name: &str) -> String {
        format!("http://{}:{}", name, self.settings.port)
    }

    /// Run `docker <args>` and return stdout.
    async fn docker(&self, args: &[&str]) -> Result<String, ProvisionError> {
        debug!(?args, "running docker");
        let output = Command::new("docker").args(args).output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ProvisionError::Command {
                command: format!("docker {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Remove a container by name; a missing container is not an error.
    async fn remove(&self, name: &str) -> Result<(), ProvisionError> {
        match self.docker(&["rm", "-f", name]).await {
            Ok(_) => Ok(()),
            Err(ProvisionError::Command { stderr, .. }) if stderr.contains("No such container") => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn wait_ready(&self, name: &str, address: &str) -> Result<(), ProvisionError> {
        let heartbeat = format!("{}/heartbeat", address);
        let started = Instant::now();
        loop {
            match self.client.get(&heartbeat).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => debug!(replica = name, status = %response.status(), "heartbeat not ready"),
                Err(err) => debug!(replica = name, error = %err, "heartbeat unreachable"),
            }
            if started.elapsed() >= self.settings.ready_timeout {
                return Err(ProvisionError::Timeout {
                    name: name.to_string(),
                    waited: started.elapsed(),
                });
            }
            sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl Provisioner for DockerProvisioner {
    async fn start(&self, name: &str) -> Result<String, ProvisionError> {
        // Reclaim a stopped container left behind under the same name.
        self.remove(name).await?;

        let server_env = format!("SERVER_ID={}", name);
        let container = self
            .docker(&[
                "run",
                "-d",
                "--name",
                name,
                "--network",
                self.settings.network.as_str(),
                "--network-alias",
                name,
                "-e",
                server_env.as_str(),
                self.settings.image.as_str(),
            ])
            .await?;
        info!(replica = name, container = %container, image = %self.settings.image, "container started");

        let address = self.address_of(name);
        if let Err(err) = self.wait_ready(name, &address).await {
            warn!(replica = name, error = %err, "replica never became ready, removing container");
            if let Err(cleanup) = self.remove(name).await {
                warn!(replica = name, error = %cleanup, "failed to remove unready container");
            }
            return Err(err);
        }
        Ok(address)
    }

    async fn stop(&self, name: &str) -> Result<(), ProvisionError> {
        self.remove(name).await?;
        info!(replica = name, "container removed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_uses_network_alias() {
        let provisioner = DockerProvisioner::new(DockerSettings {
            port: 8080,
            ..DockerSettings::default()
        });
        assert_eq!(provisioner.address_of("S7"), "http://S7:8080");
    }
}
