//! docstore - document storage over a clustered key-value and query service
//!
//! docstore stores typed documents in a bucket of a clustered key-value
//! service. Every document carries metadata (CAS, TTL, lock, timestamps)
//! that makes optimistic and pessimistic concurrency, expiry and auditing
//! available on every operation without widening signatures.
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::{ClusterRegistry, Database, DocumentStore, Input, StoreConfig};
//!
//! let registry = ClusterRegistry::new(connector);
//! let store = DocumentStore::open(&registry, &StoreConfig::new("localhost", "docs"))?;
//!
//! let mut doc = store.new_row("user-1");
//! doc.set_data(&user)?;
//! let created = store.create_one(Input::Row(doc));
//! assert!(!created.is_faulted());
//! ```
//!
//! # Architecture
//!
//! All operations go through the [`Database`] trait implemented by
//! [`DocumentStore`]. The collaborator layer (cluster, bucket, query
//! service) lives behind the traits re-exported from `docstore-bucket`.

// Re-export the public API from docstore-engine
pub use docstore_engine::*;
