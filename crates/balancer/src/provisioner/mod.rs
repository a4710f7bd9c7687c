//! Backend provisioning.
//!
//! The balancer does not care how a replica is materialized; it needs a way
//! to start one under a name and learn its base address, and a way to stop
//! it again. [`Provisioner`] is that seam.

pub mod docker;
pub mod static_hosts;

pub use docker::{DockerProvisioner, DockerSettings};
pub use static_hosts::StaticProvisioner;

use std::time::Duration;

use async_trait::async_trait;

/// Errors reported by a provisioner.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// An external command exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    /// The replica started but never became reachable.
    #[error("replica {name} not reachable after {waited:?}")]
    Timeout { name: String, waited: Duration },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Starts and stops backend replicas.
///
/// # Contract
///
/// - `start` returns only once the replica is reachable at the returned
///   base address (e.g. `http://S1:5000`). Calling it with the name of a
///   replica that was stopped earlier must succeed; implementations may
///   reclaim the old instance.
/// - `stop` is a no-op for a name that does not exist.
/// - Both calls terminate; the controller never holds a lock that blocks
///   routing while awaiting them.
#[async_trait]
pub trait Provisioner: Send + Sync + 'static {
    async fn start(&self, name: &str) -> Result<String, ProvisionError>;

    async fn stop(&self, name: &str) -> Result<(), ProvisionError>;

    /// Provisioner name, for logs.
    fn name(&self) -> &'static str;
}
