//! Collaborator error codes
//!
//! These are the conditions a bucket reports. They carry no key: the store
//! attaches the key when it classifies them into a `Fault`.

use thiserror::Error;

/// Result type alias for collaborator calls
pub type Result<T> = std::result::Result<T, BucketError>;

/// Error reported by a cluster, bucket or query service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    /// The key already exists, or a CAS/lock precondition failed
    #[error("key already exists")]
    KeyExists,

    /// The key does not exist
    #[error("key not found")]
    KeyNotFound,

    /// The value exceeds the bucket's item size limit
    #[error("value too big")]
    ValueTooBig,

    /// The server rejected the write
    #[error("not stored")]
    NotStored,

    /// The server is temporarily unable to serve the request
    #[error("temporary failure")]
    TemporaryFailure,

    /// The operation did not complete before its deadline
    #[error("operation timed out")]
    Timeout,

    /// Connecting or authenticating failed
    #[error("connection error: {0}")]
    Connection(String),

    /// One or more operations of a batch failed
    ///
    /// Per-item errors live on the operation descriptors.
    #[error("{failed} batch operation(s) failed")]
    BatchFailed {
        /// Number of failed operations
        failed: usize,
    },

    /// The request was malformed
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The handle was closed
    #[error("bucket is closed")]
    Closed,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl BucketError {
    /// Check if this is a batch aggregate rather than a single-item error
    pub fn is_aggregate(&self) -> bool {
        matches!(self, BucketError::BatchFailed { .. })
    }
}
