//! Subcommand implementations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use balancer::{
    BackendClient, ControllerConfig, DockerProvisioner, HttpBackendClient, MembershipController,
    Provisioner, RequestKey, RequestRouter, RoutingTable, StaticProvisioner,
};
use corelib::{HashRing, Ownership, RingBuilder, ServerId};
use tracing::{info, warn};

use crate::config::{BalancerConfig, Command, ProvisionerConfig};
use crate::http::{create_router, replica_router, AppState};
use crate::telemetry;

impl Command {
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Serve { config, listen } => serve(config, listen).await,
            Command::Replica { id, listen } => replica(id, listen).await,
            Command::Simulate {
                servers,
                requests,
                slots,
                vnodes,
            } => {
                let report = simulate(servers, requests, slots, vnodes)?;
                print!("{}", report);
                Ok(())
            }
        }
    }
}

fn build_ring(slots: u32, vnodes: Option<u32>) -> anyhow::Result<HashRing> {
    let mut builder = RingBuilder::new().with_slots(slots);
    if let Some(vnodes) = vnodes {
        builder = builder.with_vnodes(vnodes);
    }
    Ok(builder.build()?)
}

pub fn provisioner_from(config: &ProvisionerConfig) -> Arc<dyn Provisioner> {
    match config {
        ProvisionerConfig::Static { address_template } => {
            Arc::new(StaticProvisioner::new(address_template.clone()))
        }
        ProvisionerConfig::Docker { .. } => Arc::new(DockerProvisioner::new(
            config.docker_settings().unwrap_or_default(),
        )),
    }
}

/// Wire ring, controller and router together. Nothing is provisioned yet.
pub fn build_state(
    config: &BalancerConfig,
    provisioner: Arc<dyn Provisioner>,
    backend: Arc<dyn BackendClient>,
) -> anyhow::Result<AppState> {
    let ring = build_ring(config.slots, config.vnodes)?;
    info!(
        slots = ring.capacity(),
        vnodes = ring.vnodes_per_server(),
        provisioner = provisioner.name(),
        "ring configured"
    );

    let membership = Arc::new(MembershipController::new(
        ring,
        provisioner,
        ControllerConfig {
            name_prefix: config.name_prefix.clone(),
            rng_seed: None,
        },
    ));
    let router = Arc::new(RequestRouter::new(
        membership.clone(),
        RoutingTable::new(&config.endpoints),
        backend,
    ));
    Ok(AppState { membership, router })
}

async fn serve(config_path: Option<PathBuf>, listen: Option<String>) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => BalancerConfig::load(path)?,
        None => BalancerConfig::default(),
    };
    if let Some(listen) = listen {
        config.listen = listen;
    }
    telemetry::init(&config.log_level)?;

    let state = build_state(
        &config,
        provisioner_from(&config.provisioner),
        Arc::new(HttpBackendClient::new(config.proxy_timeout())),
    )?;

    let outcome = state
        .membership
        .bootstrap(config.initial_replicas.clone())
        .await
        .context("failed to provision initial replicas")?;
    for failure in &outcome.failures {
        warn!(replica = %failure.name, reason = %failure.reason, "initial replica not started");
    }
    info!(replicas = ?outcome.replicas.replicas, "initial replicas ready");

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, endpoints = ?config.endpoints, "balancer listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("balancer stopped");
    Ok(())
}

async fn replica(id: String, listen: String) -> anyhow::Result<()> {
    telemetry::init("info")?;
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    info!(%id, addr = %listen, "replica listening");

    axum::serve(listener, replica_router(id))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Per-server outcome of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRow {
    pub server: ServerId,
    pub requests: u32,
    /// Slots of `[0, M)` the server is responsible for.
    pub owned_slots: u32,
    pub owned_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub slots: u32,
    pub vnodes: u32,
    pub requests: u32,
    pub rows: Vec<SimulationRow>,
}

/// Route `requests` random keys through a ring of `servers` servers.
pub fn simulate(
    servers: u64,
    requests: u32,
    slots: u32,
    vnodes: Option<u32>,
) -> anyhow::Result<SimulationReport> {
    let keys = (0..requests).map(|_| RequestKey::random());
    distribution(servers, slots, vnodes, keys)
}

/// Route the given keys through a ring of `servers` servers and report how
/// they spread.
pub fn distribution<I, K>(
    servers: u64,
    slots: u32,
    vnodes: Option<u32>,
    keys: I,
) -> anyhow::Result<SimulationReport>
where
    I: IntoIterator<Item = K>,
    K: AsRef<[u8]>,
{
    let mut ring = build_ring(slots, vnodes)?;
    for id in 1..=servers {
        ring.add_server(ServerId(id))?;
    }

    let mut counts: BTreeMap<ServerId, u32> = ring.servers().into_iter().map(|id| (id, 0)).collect();
    let mut requests = 0u32;
    for key in keys {
        let server = ring.get_server(key.as_ref())?;
        *counts.entry(server).or_default() += 1;
        requests += 1;
    }

    let ownership = Ownership::from_ring(&ring);
    let rows = counts
        .into_iter()
        .map(|(server, requests)| {
            let share = ownership.get(server);
            SimulationRow {
                server,
                requests,
                owned_slots: share.map_or(0, |s| s.slots),
                owned_fraction: share.map_or(0.0, |s| s.fraction),
            }
        })
        .collect();

    Ok(SimulationReport {
        slots: ring.capacity(),
        vnodes: ring.vnodes_per_server(),
        requests,
        rows,
    })
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "=== Request Distribution (M={}, K={}, requests={}) ===",
            self.slots, self.vnodes, self.requests
        )?;
        writeln!(f, "{:>8} {:>10} {:>8} {:>12} {:>8}", "server", "requests", "share", "owned slots", "owned")?;
        for row in &self.rows {
            let share = if self.requests == 0 {
                0.0
            } else {
                f64::from(row.requests) / f64::from(self.requests)
            };
            writeln!(
                f,
                "{:>8} {:>10} {:>7.2}% {:>12} {:>7.2}%",
                row.server.to_string(),
                row.requests,
                share * 100.0,
                row.owned_slots,
                row.owned_fraction * 100.0
            )?;
        }
        Ok(())
    }
}
