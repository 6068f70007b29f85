//! Core types for docstore
//!
//! This crate defines the data model shared by the store and its
//! collaborators:
//! - Document: identity, type tag, payload, metadata, fault state
//! - Metadata: the metadata protocol (CAS, TTL, LOCK, timestamps, query knobs)
//! - Cas: compare-and-swap tokens
//! - Query: statement, parameters and query metadata
//! - Fault: the stable failure taxonomy attached to documents
//! - wire: the persisted document format

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cas;
pub mod coerce;
pub mod document;
pub mod error;
pub mod metadata;
pub mod query;
pub mod wire;

pub use cas::Cas;
pub use coerce::{to_i64, to_u32, MetaValue};
pub use document::{type_tag_of, Document, Payload, KEY_SEPARATOR};
pub use error::{Error, Fault, FaultKind, Result};
pub use metadata::{
    Metadata, ScanConsistency, ADHOC, CAS, CONSISTENCY, CREATEDON, LOCK, TIMEOUT, TTL, UPDATEDON,
};
pub use query::{Query, QueryParams};
