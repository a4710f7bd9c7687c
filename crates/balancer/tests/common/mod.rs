//! In-memory provisioner and backend used by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use balancer::{
    BackendClient, BackendError, BackendResponse, ControllerConfig, MembershipController,
    ProvisionError, Provisioner,
};
use bytes::Bytes;
use corelib::{HashRing, RingBuilder};
use parking_lot::Mutex;

/// Tracks running replicas; names in `fail_start`/`fail_stop` fail on demand.
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    pub running: Mutex<BTreeSet<String>>,
    pub started: Mutex<Vec<String>>,
    pub stopped: Mutex<Vec<String>>,
    fail_start: HashSet<String>,
    fail_stop: HashSet<String>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start(names: &[&str]) -> Self {
        Self {
            fail_start: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_stop(names: &[&str]) -> Self {
        Self {
            fail_stop: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn running(&self) -> Vec<String> {
        self.running.lock().iter().cloned().collect()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().clone()
    }
}

pub fn address_of(name: &str) -> String {
    format!("http://{}:5000", name)
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn start(&self, name: &str) -> Result<String, ProvisionError> {
        self.started.lock().push(name.to_string());
        if self.fail_start.contains(name) {
            return Err(ProvisionError::Command {
                command: format!("start {}", name),
                stderr: "image not found".to_string(),
            });
        }
        self.running.lock().insert(name.to_string());
        Ok(address_of(name))
    }

    async fn stop(&self, name: &str) -> Result<(), ProvisionError> {
        self.stopped.lock().push(name.to_string());
        self.running.lock().remove(name);
        if self.fail_stop.contains(name) {
            return Err(ProvisionError::Command {
                command: format!("stop {}", name),
                stderr: "daemon not responding".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Answers like a replica's `/home`; addresses in `down` time out and
/// addresses in `statuses` answer with that status code.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    down: Mutex<HashSet<String>>,
    statuses: Mutex<HashMap<String, u16>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_down(&self, address: &str) {
        self.down.lock().insert(address.to_string());
    }

    pub fn answer_with(&self, address: &str, status: u16) {
        self.statuses.lock().insert(address.to_string(), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn get(&self, address: &str, path: &str) -> Result<BackendResponse, BackendError> {
        self.calls.lock().push(format!("{}/{}", address, path));
        if self.down.lock().contains(address) {
            return Err(BackendError::Timeout(Duration::from_secs(3)));
        }
        let status = self.statuses.lock().get(address).copied().unwrap_or(200);
        let server = address
            .trim_start_matches("http://")
            .trim_end_matches(":5000");
        Ok(BackendResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(format!(
                r#"{{"message":"Hello from Server: {}","status":"successful"}}"#,
                server
            )),
        })
    }
}

pub fn ring() -> HashRing {
    RingBuilder::new().with_slots(512).with_vnodes(9).build().unwrap()
}

pub fn controller(provisioner: Arc<FakeProvisioner>) -> MembershipController {
    controller_with_ring(ring(), provisioner)
}

pub fn controller_with_ring(ring: HashRing, provisioner: Arc<FakeProvisioner>) -> MembershipController {
    MembershipController::new(
        ring,
        provisioner,
        ControllerConfig {
            name_prefix: "S".to_string(),
            rng_seed: Some(42),
        },
    )
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
