//! Host-keyed cluster registry
//!
//! Ensures only one cluster handle exists per host. Stores opened against
//! the same host through one registry share that handle, and concurrent
//! opens never connect twice.
//!
//! The registry is an owned value rather than process-wide state, so each
//! test (or each application component) can hold its own. The mutex is held
//! for the lookup-or-create step only, never for the lifetime of an
//! operation.
//!
//! Uses parking_lot::Mutex instead of std::sync::Mutex so a panic inside a
//! connector cannot poison the registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::traits::{Cluster, Connector};

/// Cache of cluster handles keyed by host
pub struct ClusterRegistry {
    connector: Arc<dyn Connector>,
    clusters: Mutex<HashMap<String, Arc<dyn Cluster>>>,
}

impl ClusterRegistry {
    /// Create an empty registry that connects through `connector`
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        ClusterRegistry {
            connector,
            clusters: Mutex::new(HashMap::new()),
        }
    }

    /// Cluster handle for `host`, connecting on first use
    ///
    /// A failed connect leaves no entry behind, so the next call retries.
    pub fn cluster(&self, host: &str) -> Result<Arc<dyn Cluster>> {
        let mut clusters = self.clusters.lock();
        if let Some(cluster) = clusters.get(host) {
            debug!(target: "docstore::registry", host, "Returning cached cluster handle");
            return Ok(Arc::clone(cluster));
        }

        let cluster = self.connector.connect(host)?;
        info!(target: "docstore::registry", host, "Connected to cluster");
        clusters.insert(host.to_string(), Arc::clone(&cluster));
        Ok(cluster)
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.clusters.lock().len()
    }

    /// Check if no handle is cached
    pub fn is_empty(&self) -> bool {
        self.clusters.lock().is_empty()
    }

    /// Check if a handle for `host` is cached
    pub fn contains(&self, host: &str) -> bool {
        self.clusters.lock().contains_key(host)
    }

    /// Drop the handle for `host`; the next `cluster` call reconnects
    pub fn evict(&self, host: &str) -> bool {
        let removed = self.clusters.lock().remove(host).is_some();
        if removed {
            info!(target: "docstore::registry", host, "Evicted cluster handle");
        }
        removed
    }

    /// Drop every cached handle
    pub fn clear(&self) {
        self.clusters.lock().clear();
    }
}

impl std::fmt::Debug for ClusterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hosts: Vec<String> = self.clusters.lock().keys().cloned().collect();
        f.debug_struct("ClusterRegistry").field("hosts", &hosts).finish()
    }
}
