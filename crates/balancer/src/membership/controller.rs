//! Membership controller.
//!
//! # Locking
//!
//! - `state` (a `parking_lot::RwLock`) guards the ring together with the
//!   replica table. It is held only for in-memory work, never across a
//!   provisioner call, so routing never waits on a slow backend.
//! - `control` (a `tokio::sync::Mutex`) serializes whole scale operations,
//!   from validation to the last provisioner call. Lookups never take it.
//!
//! # Ordering
//!
//! Scale-up: provisioner `start` -> ring add + table insert (one write
//! section). The ring never references a replica whose backend is not up,
//! and a lookup can never see a ring entry without its address.
//!
//! Scale-down: ring removal (replica marked `Removed`) -> provisioner `stop`
//! -> table removal. No new lookup lands on a replica being torn down; a
//! request routed just before removal may still fail against it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use corelib::{HashRing, RingError, ServerId, ServerStatus};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::naming::{is_valid_name, synthesize_name};
use super::types::{ReplicaInfo, ReplicaSet, ScaleFailure, ScaleOutcome, Target};
use crate::error::{BalancerError, Result};
use crate::provisioner::Provisioner;

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Prefix of synthesized replica names.
    pub name_prefix: String,
    /// Seed for name synthesis and random victim selection. `None` seeds
    /// from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name_prefix: "S".to_string(),
            rng_seed: None,
        }
    }
}

#[derive(Debug)]
struct Replica {
    name: String,
    address: String,
    status: ServerStatus,
}

#[derive(Debug)]
struct State {
    ring: HashRing,
    replicas: HashMap<ServerId, Replica>,
    /// Every recorded name, including replicas still being torn down.
    names: BTreeMap<String, ServerId>,
}

impl State {
    fn active_names(&self) -> impl Iterator<Item = &String> + '_ {
        self.names
            .iter()
            .filter(|(_, id)| self.replicas.get(*id).is_some_and(|r| r.status.is_active()))
            .map(|(name, _)| name)
    }

    fn active_id(&self, name: &str) -> Option<ServerId> {
        let id = *self.names.get(name)?;
        self.replicas
            .get(&id)
            .filter(|r| r.status.is_active())
            .map(|_| id)
    }
}

/// Owns the hash ring and the name -> replica mapping; every mutation of
/// either goes through it.
pub struct MembershipController {
    state: RwLock<State>,
    control: tokio::sync::Mutex<()>,
    provisioner: Arc<dyn Provisioner>,
    next_id: AtomicU64,
    rng: Mutex<StdRng>,
    name_prefix: String,
}

impl MembershipController {
    /// Wrap an (empty) ring. Replicas are added with [`Self::bootstrap`] or
    /// [`Self::scale_up`].
    pub fn new(ring: HashRing, provisioner: Arc<dyn Provisioner>, config: ControllerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: RwLock::new(State {
                ring,
                replicas: HashMap::new(),
                names: BTreeMap::new(),
            }),
            control: tokio::sync::Mutex::new(()),
            provisioner,
            next_id: AtomicU64::new(1),
            rng: Mutex::new(rng),
            name_prefix: config.name_prefix,
        }
    }

    /// Active replicas, names ascending.
    pub fn list(&self) -> ReplicaSet {
        let state = self.state.read();
        let replicas: Vec<String> = state.active_names().cloned().collect();
        ReplicaSet {
            count: replicas.len(),
            replicas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().ring.is_empty()
    }

    /// Provision the initial replica list.
    pub async fn bootstrap(&self, names: Vec<String>) -> Result<ScaleOutcome> {
        let n = names.len();
        self.scale_up(n, names).await
    }

    /// Add `n` replicas, using `preferred` names for the first positions and
    /// synthesized names for the rest.
    ///
    /// Malformed requests and name conflicts are rejected before anything is
    /// provisioned. After that, a replica that fails to start is reported in
    /// [`ScaleOutcome::failures`] and the remaining ones are still added.
    pub async fn scale_up(&self, n: usize, preferred: Vec<String>) -> Result<ScaleOutcome> {
        let _control = self.control.lock().await;

        if preferred.len() > n {
            return Err(BalancerError::Validation(
                "Length of hostname list is more than newly added instances".to_string(),
            ));
        }
        let names = self.plan_additions(n, preferred)?;
        info!(count = names.len(), replicas = ?names, "scaling up");

        let mut failures = Vec::new();
        for name in names {
            if let Err(err) = self.add_replica(&name).await {
                warn!(replica = %name, error = %err, "failed to add replica");
                failures.push(ScaleFailure {
                    name,
                    reason: err.to_string(),
                });
            }
        }

        Ok(ScaleOutcome {
            replicas: self.list(),
            failures,
        })
    }

    /// Remove `n` replicas: every name in `explicit`, plus randomly chosen
    /// active replicas to make up the difference.
    ///
    /// Fails without removing anything if `explicit` is longer than `n`,
    /// names a replica that is not active, or the active set is too small.
    pub async fn scale_down(&self, n: usize, explicit: Vec<String>) -> Result<ScaleOutcome> {
        let _control = self.control.lock().await;

        if explicit.len() > n {
            return Err(BalancerError::Validation(
                "Length of hostname list is more than removable instances".to_string(),
            ));
        }
        let victims = self.plan_removals(n, explicit)?;
        let victim_names: Vec<&str> = victims.iter().map(|(name, _)| name.as_str()).collect();
        info!(count = victims.len(), replicas = ?victim_names, "scaling down");

        let mut failures = Vec::new();
        for (name, id) in victims {
            if let Err(err) = self.remove_replica(&name, id).await {
                warn!(replica = %name, error = %err, "replica left the ring but did not stop cleanly");
                failures.push(ScaleFailure {
                    name,
                    reason: err.to_string(),
                });
            }
        }

        Ok(ScaleOutcome {
            replicas: self.list(),
            failures,
        })
    }

    /// Resolve a request key to the replica that serves it.
    ///
    /// # Errors
    ///
    /// - [`BalancerError::NoActiveServers`] on an empty ring
    /// - [`BalancerError::RoutingInconsistency`] if the ring names a server
    ///   without an active membership record
    pub fn resolve(&self, key: &[u8]) -> Result<Target> {
        let state = self.state.read();
        let id = state.ring.get_server(key).map_err(|err| match err {
            RingError::EmptyRing => BalancerError::NoActiveServers,
            other => BalancerError::Ring(other),
        })?;
        let replica = state
            .replicas
            .get(&id)
            .filter(|r| r.status.is_active())
            .ok_or(BalancerError::RoutingInconsistency(id))?;
        Ok(Target {
            id,
            name: replica.name.clone(),
            address: replica.address.clone(),
        })
    }

    /// Details of a recorded replica, including its ring slots.
    pub fn describe(&self, name: &str) -> Option<ReplicaInfo> {
        let state = self.state.read();
        let id = *state.names.get(name)?;
        let replica = state.replicas.get(&id)?;
        Some(ReplicaInfo {
            name: replica.name.clone(),
            id,
            address: replica.address.clone(),
            status: replica.status,
            slots: state.ring.slots_of(id),
        })
    }

    /// Occupied ring slots with the owning replica's name.
    pub fn ring_snapshot(&self) -> Vec<(corelib::Slot, String)> {
        let state = self.state.read();
        state
            .ring
            .snapshot()
            .into_iter()
            .filter_map(|(slot, id)| state.replicas.get(&id).map(|r| (slot, r.name.clone())))
            .collect()
    }

    fn plan_additions(&self, n: usize, preferred: Vec<String>) -> Result<Vec<String>> {
        let mut taken: HashSet<String> = self.state.read().names.keys().cloned().collect();
        let mut planned = Vec::with_capacity(n);

        for name in preferred {
            if !is_valid_name(&name) {
                return Err(BalancerError::Validation(format!("invalid hostname '{}'", name)));
            }
            if !taken.insert(name.clone()) {
                return Err(BalancerError::NameConflict(name));
            }
            planned.push(name);
        }

        let mut rng = self.rng.lock();
        while planned.len() < n {
            let name = synthesize_name(&mut *rng, &self.name_prefix, &taken);
            if !is_valid_name(&name) {
                return Err(BalancerError::Validation(format!(
                    "name prefix '{}' yields invalid hostname '{}'",
                    self.name_prefix, name
                )));
            }
            taken.insert(name.clone());
            planned.push(name);
        }
        Ok(planned)
    }

    fn plan_removals(&self, n: usize, explicit: Vec<String>) -> Result<Vec<(String, ServerId)>> {
        let state = self.state.read();
        let mut victims = Vec::with_capacity(n);
        let mut chosen = HashSet::new();

        for name in explicit {
            let id = state.active_id(&name).ok_or_else(|| {
                BalancerError::Validation(format!("hostname '{}' is not an active replica", name))
            })?;
            if !chosen.insert(name.clone()) {
                return Err(BalancerError::Validation(format!(
                    "hostname '{}' listed more than once",
                    name
                )));
            }
            victims.push((name, id));
        }

        let remaining = n - victims.len();
        if remaining > 0 {
            let candidates: Vec<&String> = state
                .active_names()
                .filter(|name| !chosen.contains(*name))
                .collect();
            if candidates.len() < remaining {
                return Err(BalancerError::Validation("Not enough servers to remove".to_string()));
            }
            let mut rng = self.rng.lock();
            for name in candidates.choose_multiple(&mut *rng, remaining) {
                if let Some(id) = state.active_id(name) {
                    victims.push(((*name).clone(), id));
                }
            }
        }
        Ok(victims)
    }

    async fn add_replica(&self, name: &str) -> Result<()> {
        let address = self.provisioner.start(name).await?;
        let id = ServerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let placed = {
            let mut state = self.state.write();
            let placed = state.ring.add_server(id);
            if placed.is_ok() {
                state.replicas.insert(
                    id,
                    Replica {
                        name: name.to_string(),
                        address: address.clone(),
                        status: ServerStatus::Active,
                    },
                );
                state.names.insert(name.to_string(), id);
            }
            placed
        };

        if let Err(err) = placed {
            // The backend is up but has no place on the ring; tear it down.
            if let Err(stop_err) = self.provisioner.stop(name).await {
                warn!(replica = name, error = %stop_err, "failed to stop unplaced replica");
            }
            return Err(err.into());
        }

        info!(replica = name, %id, %address, provisioner = self.provisioner.name(), "replica added");
        Ok(())
    }

    async fn remove_replica(&self, name: &str, id: ServerId) -> Result<()> {
        {
            let mut state = self.state.write();
            state.ring.remove_server(id);
            if let Some(replica) = state.replicas.get_mut(&id) {
                replica.status = ServerStatus::Removed;
            }
        }
        debug!(replica = name, %id, "replica left the ring");

        let stopped = self.provisioner.stop(name).await;

        {
            let mut state = self.state.write();
            state.replicas.remove(&id);
            state.names.remove(name);
        }
        stopped?;

        info!(replica = name, %id, "replica removed");
        Ok(())
    }
}

impl std::fmt::Debug for MembershipController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipController")
            .field("replicas", &self.list())
            .field("provisioner", &self.provisioner.name())
            .finish()
    }
}
