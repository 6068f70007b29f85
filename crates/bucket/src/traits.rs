//! Collaborator contract
//!
//! The store talks to the underlying database only through these traits:
//!
//! ```text
//! Connector --connect(host)--> Cluster --open_bucket(name)--> Bucket
//! ```
//!
//! Connection pooling, the binary protocol and query planning all live
//! behind them. Every method is synchronous and must be safe to call from
//! several threads at once.

use std::sync::Arc;

use docstore_core::Cas;

use crate::error::{BucketError, Result};
use crate::ops::{BulkOp, OpKind};
use crate::query::{QueryRequest, RowIterator};

/// Bucket credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bucket password, if the bucket requires one
    pub password: Option<String>,
}

impl Credentials {
    /// Credentials with a password
    pub fn with_password(password: impl Into<String>) -> Self {
        Credentials {
            password: Some(password.into()),
        }
    }
}

/// A value read from a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Stored bytes
    pub value: Vec<u8>,
    /// CAS of the stored value
    pub cas: Cas,
}

/// Creates cluster handles
pub trait Connector: Send + Sync {
    /// Connect to the cluster at `host`
    fn connect(&self, host: &str) -> Result<Arc<dyn Cluster>>;
}

/// A connected cluster
pub trait Cluster: Send + Sync {
    /// Open a bucket
    fn open_bucket(&self, name: &str, credentials: &Credentials) -> Result<Arc<dyn Bucket>>;
}

/// An open bucket
///
/// Single-item operations return the resulting CAS. A zero `cas` argument
/// means "no CAS check".
pub trait Bucket: Send + Sync {
    /// Bucket name
    fn name(&self) -> &str;

    /// Insert if absent
    fn insert(&self, key: &str, value: &[u8], expiry: u32) -> Result<Cas>;

    /// Plain read
    fn get(&self, key: &str) -> Result<Fetched>;

    /// Read and lock for `lock_time` seconds
    fn get_and_lock(&self, key: &str, lock_time: u32) -> Result<Fetched>;

    /// Replace an existing value
    fn replace(&self, key: &str, value: &[u8], cas: Cas, expiry: u32) -> Result<Cas>;

    /// Replace or insert
    fn upsert(&self, key: &str, value: &[u8], expiry: u32) -> Result<Cas>;

    /// Remove
    fn remove(&self, key: &str, cas: Cas) -> Result<Cas>;

    /// Refresh expiry
    fn touch(&self, key: &str, cas: Cas, expiry: u32) -> Result<Cas>;

    /// Release a lock
    fn unlock(&self, key: &str, cas: Cas) -> Result<Cas>;

    /// Execute a batch in one round-trip
    ///
    /// Every descriptor gets its own outcome. The returned error is an
    /// aggregate and is set when any item failed; it says nothing about
    /// which one. The default implementation dispatches item by item.
    fn execute_batch(&self, ops: &mut [BulkOp]) -> Result<()> {
        execute_each(self, ops)
    }

    /// Submit a statement to the query service
    fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn RowIterator>>;

    /// Close the bucket
    fn close(&self) -> Result<()>;
}

/// Run every descriptor of a batch as an individual call
///
/// Fills `cas`, `value`, `err` and `executed` on each descriptor and reports
/// `BatchFailed` when any of them failed.
pub fn execute_each<B: Bucket + ?Sized>(bucket: &B, ops: &mut [BulkOp]) -> Result<()> {
    let mut failed = 0;
    for op in ops.iter_mut() {
        let outcome = match op.kind {
            OpKind::Insert => bucket.insert(&op.key, &op.value, op.expiry),
            OpKind::Get => bucket.get(&op.key).map(|f| {
                op.value = f.value;
                f.cas
            }),
            OpKind::GetAndLock { lock_time } => bucket.get_and_lock(&op.key, lock_time).map(|f| {
                op.value = f.value;
                f.cas
            }),
            OpKind::Replace => bucket.replace(&op.key, &op.value, op.cas, op.expiry),
            OpKind::Upsert => bucket.upsert(&op.key, &op.value, op.expiry),
            OpKind::Remove => bucket.remove(&op.key, op.cas),
            OpKind::Touch => bucket.touch(&op.key, op.cas, op.expiry),
            OpKind::Unlock => bucket.unlock(&op.key, op.cas),
        };
        op.executed = true;
        match outcome {
            Ok(cas) => {
                op.cas = cas;
                op.err = None;
            }
            Err(e) => {
                op.err = Some(e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        Err(BucketError::BatchFailed { failed })
    } else {
        Ok(())
    }
}
