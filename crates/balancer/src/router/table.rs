//! Routing table and request keys.

use std::collections::HashMap;

use rand::Rng;

/// Range of the synthetic request ids used when no client key is supplied.
const RANDOM_KEY_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// An endpoint forwarded to replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    backend_path: String,
}

impl Endpoint {
    pub fn backend_path(&self) -> &str {
        &self.backend_path
    }
}

/// Explicit `path -> endpoint` table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    endpoints: HashMap<String, Endpoint>,
}

impl RoutingTable {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = paths
            .into_iter()
            .map(|path| {
                let path = normalize(path.as_ref()).to_string();
                (path.clone(), Endpoint { backend_path: path })
            })
            .collect();
        Self { endpoints }
    }

    /// Look up a request path; leading and trailing slashes are ignored.
    pub fn resolve(&self, path: &str) -> Option<&Endpoint> {
        self.endpoints.get(normalize(path))
    }

    /// Served paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// The value hashed to pick a replica.
///
/// Keying on a real client identity gives session affinity. With
/// [`RequestKey::random`] every request gets a fresh id in
/// `[100000, 999999]`, so consecutive requests from one client land anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(Vec<u8>);

impl RequestKey {
    pub fn from_client(id: impl AsRef<[u8]>) -> Self {
        Self(id.as_ref().to_vec())
    }

    pub fn random() -> Self {
        let id: u32 = rand::thread_rng().gen_range(RANDOM_KEY_RANGE);
        Self(id.to_string().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RequestKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
