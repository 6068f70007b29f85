//! Batch operation descriptors
//!
//! A batch is a slice of [`BulkOp`]s submitted in one round-trip. The
//! collaborator fills in `cas`, `value` (for reads) and `err` on every
//! descriptor it runs and marks it `executed`; the aggregate result of the
//! batch call only says whether any of them failed. A descriptor left
//! unexecuted never reached the store, whatever its `cas` holds.

use docstore_core::Cas;

use crate::error::BucketError;

/// What a descriptor asks the bucket to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Insert if absent
    Insert,
    /// Plain read
    Get,
    /// Read and lock for `lock_time` seconds
    GetAndLock {
        /// Lock duration in seconds
        lock_time: u32,
    },
    /// Replace an existing value, CAS-conditional when `cas` is set
    Replace,
    /// Replace or insert
    Upsert,
    /// Remove, CAS-conditional when `cas` is set
    Remove,
    /// Refresh expiry
    Touch,
    /// Release a lock acquired by `GetAndLock`
    Unlock,
}

impl OpKind {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Insert => "insert",
            OpKind::Get => "get",
            OpKind::GetAndLock { .. } => "get_and_lock",
            OpKind::Replace => "replace",
            OpKind::Upsert => "upsert",
            OpKind::Remove => "remove",
            OpKind::Touch => "touch",
            OpKind::Unlock => "unlock",
        }
    }
}

/// One item of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOp {
    /// Operation
    pub kind: OpKind,
    /// Storage key
    pub key: String,
    /// Value to write, or the value read back
    pub value: Vec<u8>,
    /// CAS precondition on input, resulting CAS on output
    pub cas: Cas,
    /// Expiry in seconds, 0 for none
    pub expiry: u32,
    /// Per-item error, set by the collaborator
    pub err: Option<BucketError>,
    /// Set by the collaborator once the item ran, successfully or not
    pub executed: bool,
}

impl BulkOp {
    fn new(kind: OpKind, key: impl Into<String>) -> Self {
        BulkOp {
            kind,
            key: key.into(),
            value: Vec::new(),
            cas: Cas::NONE,
            expiry: 0,
            err: None,
            executed: false,
        }
    }

    /// Insert-if-absent descriptor
    ///
    /// Inserts carry no CAS precondition: the key must be absent, so a CAS
    /// in the document metadata is ignored.
    pub fn insert(key: impl Into<String>, value: Vec<u8>, expiry: u32) -> Self {
        BulkOp {
            value,
            expiry,
            ..Self::new(OpKind::Insert, key)
        }
    }

    /// Read descriptor
    pub fn get(key: impl Into<String>) -> Self {
        Self::new(OpKind::Get, key)
    }

    /// Locking read descriptor
    pub fn get_and_lock(key: impl Into<String>, lock_time: u32) -> Self {
        Self::new(OpKind::GetAndLock { lock_time }, key)
    }

    /// Replace descriptor
    pub fn replace(key: impl Into<String>, value: Vec<u8>, cas: Cas, expiry: u32) -> Self {
        BulkOp {
            value,
            cas,
            expiry,
            ..Self::new(OpKind::Replace, key)
        }
    }

    /// Upsert descriptor
    pub fn upsert(key: impl Into<String>, value: Vec<u8>, expiry: u32) -> Self {
        BulkOp {
            value,
            expiry,
            ..Self::new(OpKind::Upsert, key)
        }
    }

    /// Remove descriptor
    pub fn remove(key: impl Into<String>, cas: Cas) -> Self {
        BulkOp {
            cas,
            ..Self::new(OpKind::Remove, key)
        }
    }

    /// Touch descriptor
    pub fn touch(key: impl Into<String>, cas: Cas, expiry: u32) -> Self {
        BulkOp {
            cas,
            expiry,
            ..Self::new(OpKind::Touch, key)
        }
    }

    /// Unlock descriptor
    pub fn unlock(key: impl Into<String>, cas: Cas) -> Self {
        BulkOp {
            cas,
            ..Self::new(OpKind::Unlock, key)
        }
    }

    /// Check if the collaborator ran this item and reported success
    pub fn is_ok(&self) -> bool {
        self.executed && self.err.is_none()
    }
}
