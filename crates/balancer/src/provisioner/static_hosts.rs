//! Provisioner for replicas managed outside the balancer.

use async_trait::async_trait;
use tracing::debug;

use super::{ProvisionError, Provisioner};

/// Default address template: replicas reachable by name on port 5000.
pub const DEFAULT_ADDRESS_TEMPLATE: &str = "http://{name}:5000";

/// Maps replica names to addresses with a template; starting and stopping
/// are left to whatever orchestrates the replicas.
#[derive(Debug, Clone)]
pub struct StaticProvisioner {
    template: String,
}

impl StaticProvisioner {
    /// `template` must contain `{name}`, e.g. `http://{name}.svc:5000`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn address_of(&self, name: &str) -> String {
        self.template.replace("{name}", name)
    }
}

impl Default for StaticProvisioner {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_TEMPLATE)
    }
}

#[async_trait]
impl Provisioner for StaticProvisioner {
    async fn start(&self, name: &str) -> Result<String, ProvisionError> {
        let address = self.address_of(name);
        debug!(replica = name, %address, "static replica registered");
        Ok(address)
    }

    async fn stop(&self, name: &str) -> Result<(), ProvisionError> {
        debug!(replica = name, "static replica released");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renders_template() {
        let provisioner = StaticProvisioner::new("http://{name}.replicas.local:8080");
        assert_eq!(
            provisioner.start("S1").await.unwrap(),
            "http://S1.replicas.local:8080"
        );
        provisioner.stop("S1").await.unwrap();
        provisioner.stop("never-started").await.unwrap();
    }

    #[test]
    fn test_default_template() {
        assert_eq!(StaticProvisioner::default().address_of("S2"), "http://S2:5000");
    }
}
