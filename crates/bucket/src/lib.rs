//! Storage collaborator layer for docstore
//!
//! This crate defines everything the store needs from the underlying
//! database, and nothing of the store itself:
//! - Connector / Cluster / Bucket: the outbound contract
//! - BulkOp: batch descriptors carrying per-item outcomes
//! - QueryRequest / RowIterator: query submission and raw row cursors
//! - BucketError: collaborator error codes
//! - ClusterRegistry: one cluster handle per host
//! - memory: an in-memory collaborator used by tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod ops;
pub mod query;
pub mod registry;
pub mod traits;

pub use error::{BucketError, Result};
pub use memory::{MemoryBucket, MemoryCluster, MemoryConnector, VecRows};
pub use ops::{BulkOp, OpKind};
pub use query::{QueryRequest, RowIterator};
pub use registry::ClusterRegistry;
pub use traits::{execute_each, Bucket, Cluster, Connector, Credentials, Fetched};
