//! In-memory collaborator
//!
//! A test double for the collaborator contract with the CAS, expiry and
//! locking behaviour of a clustered key-value store. It is what the store's
//! tests run against; it is not a database engine.
//!
//! - Every mutation assigns a fresh, strictly increasing CAS.
//! - Expired values behave as absent.
//! - A locked value rejects mutations that do not carry the lock's CAS
//!   with `KeyExists`, and rejects a second lock with `TemporaryFailure`.
//!   Plain reads of a locked value return `Cas(u64::MAX)`.
//! - Queries are a full scan in key order. Named parameters filter on
//!   top-level field equality. Statements are not parsed.
//!
//! State is shared per `(host, bucket)` for the lifetime of the
//! `MemoryConnector`, so reconnecting sees the same data.

mod bucket;
mod rows;

pub use bucket::{MemoryBucket, DEFAULT_MAX_VALUE_SIZE, MAX_LOCK_TIME};
pub use rows::VecRows;

use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{BucketError, Result};
use crate::traits::{Bucket, Cluster, Connector, Credentials};

use bucket::SharedBucket;

/// Connector handing out in-memory clusters
#[derive(Debug, Default)]
pub struct MemoryConnector {
    clusters: DashMap<String, Arc<MemoryCluster>>,
    rejected: DashSet<String>,
    connects: AtomicUsize,
}

impl MemoryConnector {
    /// Create a connector with no clusters
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail for `host`
    pub fn reject_host(&self, host: impl Into<String>) {
        self.rejected.insert(host.into());
    }

    /// Number of successful `connect` calls
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The cluster behind `host`, created if missing
    pub fn cluster(&self, host: &str) -> Arc<MemoryCluster> {
        Arc::clone(
            self.clusters
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(MemoryCluster::new()))
                .value(),
        )
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, host: &str) -> Result<Arc<dyn Cluster>> {
        if host.is_empty() || self.rejected.contains(host) {
            return Err(BucketError::Connection(format!(
                "cannot connect to '{}'",
                host
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let cluster: Arc<dyn Cluster> = self.cluster(host);
        Ok(cluster)
    }
}

/// In-memory cluster holding named buckets
#[derive(Debug, Default)]
pub struct MemoryCluster {
    buckets: DashMap<String, Arc<SharedBucket>>,
    passwords: DashMap<String, String>,
}

impl MemoryCluster {
    /// Create a cluster with no buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `password` when opening bucket `name`
    pub fn set_password(&self, name: impl Into<String>, password: impl Into<String>) {
        self.passwords.insert(name.into(), password.into());
    }

    /// A fresh handle on bucket `name`, created if missing
    ///
    /// Handles share data; closing one does not close the others.
    pub fn bucket(&self, name: &str) -> MemoryBucket {
        let shared = Arc::clone(
            self.buckets
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(SharedBucket::new(DEFAULT_MAX_VALUE_SIZE)))
                .value(),
        );
        MemoryBucket::from_shared(name, shared)
    }
}

impl Cluster for MemoryCluster {
    fn open_bucket(&self, name: &str, credentials: &Credentials) -> Result<Arc<dyn Bucket>> {
        if let Some(expected) = self.passwords.get(name) {
            if credentials.password.as_deref() != Some(expected.as_str()) {
                return Err(BucketError::Connection(format!(
                    "authentication failed for bucket '{}'",
                    name
                )));
            }
        }
        Ok(Arc::new(self.bucket(name)))
    }
}
