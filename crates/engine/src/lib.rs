//! Document store engine for docstore
//!
//! This crate turns a collaborator bucket into a document store:
//! - Database: the CRUD-plus-query capability set
//! - DocumentStore: the bucket-backed implementation
//! - Input normalization and fault classification
//! - QueryResult: drained, single-consumption query rows
//! - StoreConfig: `docstore.toml` loading
//!
//! Item-level failures never surface as `Err`: they are attached to the
//! returned documents as [`Fault`]s. Only query execution and store
//! lifecycle calls return `Result`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod database;
pub mod input;
pub mod outcome;
pub mod query_result;
pub mod raw_query;
mod store;

pub use classify::{classify, OpCategory};
pub use config::{StoreConfig, CONFIG_FILE_NAME, DEFAULT_MAX_QUERY_ROWS, DEFAULT_STORE_NAME};
pub use database::Database;
pub use input::{normalize, normalize_for_create, Input};
pub use outcome::BulkOutcome;
pub use query_result::QueryResult;
pub use raw_query::{RawQuery, RawRow};
pub use store::DocumentStore;

pub use docstore_bucket::{
    Bucket, BucketError, BulkOp, Cluster, ClusterRegistry, Connector, Credentials, MemoryBucket,
    MemoryCluster, MemoryConnector, OpKind, QueryRequest, RowIterator,
};
pub use docstore_core::{
    Cas, Document, Fault, FaultKind, MetaValue, Metadata, Payload, Query, QueryParams,
    ScanConsistency, ADHOC, CAS, CONSISTENCY, CREATEDON, LOCK, TIMEOUT, TTL, UPDATEDON,
};

/// Result type for store-level calls
pub type Result<T> = std::result::Result<T, Fault>;
