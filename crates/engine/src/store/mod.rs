//! Document store over a collaborator bucket
//!
//! `DocumentStore` implements [`Database`] on top of one open bucket. Every
//! operation follows the same shape:
//!
//! ```text
//! normalize inputs -> stamp metadata -> build descriptors -> submit -> reconcile
//! ```
//!
//! Reconciliation never trusts the aggregate batch error for any single
//! item: every descriptor is re-read and its own error, if any, is
//! classified onto the matching document. A descriptor the collaborator
//! never executed takes the batch-level error instead.

mod create;
mod destroy;
mod exec;
mod read;
mod write;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use docstore_bucket::{Bucket, BucketError, BulkOp, ClusterRegistry, Credentials};
use docstore_core::{wire, Cas, Document, Fault, FaultKind, Query};

use crate::classify::{classify, OpCategory};
use crate::config::StoreConfig;
use crate::database::Database;
use crate::input::Input;
use crate::outcome::BulkOutcome;
use crate::query_result::QueryResult;
use crate::Result;

/// A [`Database`] backed by one bucket
pub struct DocumentStore {
    name: RwLock<String>,
    host: String,
    bucket: Arc<dyn Bucket>,
    max_query_rows: usize,
    closed: AtomicBool,
}

impl DocumentStore {
    /// Open the bucket described by `config`
    ///
    /// The cluster handle for `config.host` comes from `registry`, so
    /// stores opened against the same host share one connection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` for an invalid config, and `Internal` when
    /// connecting or opening the bucket fails.
    pub fn open(registry: &ClusterRegistry, config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let cluster = registry.cluster(&config.host).map_err(|e| {
            Fault::internal(format!("cannot connect to '{}': {}", config.host, e))
        })?;
        let credentials = Credentials {
            password: config.password.clone(),
        };
        let bucket = cluster
            .open_bucket(&config.bucket, &credentials)
            .map_err(|e| {
                Fault::internal(format!("cannot open bucket '{}': {}", config.bucket, e))
            })?;

        info!(
            target: "docstore::store",
            host = %config.host,
            bucket = %config.bucket,
            name = %config.name,
            "Opened document store"
        );

        Ok(DocumentStore {
            name: RwLock::new(config.name.clone()),
            host: config.host.clone(),
            bucket,
            max_query_rows: config.max_query_rows,
            closed: AtomicBool::new(false),
        })
    }

    /// Host of the underlying cluster
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Name of the underlying bucket
    pub fn bucket_name(&self) -> &str {
        self.bucket.name()
    }

    /// Check if `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Shared reconciliation helpers
    // =========================================================================

    /// Attach a fault, logging the ones the taxonomy could not name
    fn fault(&self, operation: &'static str, doc: &mut Document, fault: Fault) {
        if fault.kind() == FaultKind::Internal {
            warn!(target: "docstore::store", operation, error = %fault, "Item faulted");
        }
        doc.set_fault(fault);
    }

    /// Submit one batch for the documents that are not yet faulted
    ///
    /// `build` turns a document into its descriptor (or a fault, in which
    /// case nothing is sent for it). After the batch, every descriptor is
    /// reconciled onto its document: its error is classified, or `settle`
    /// applies its result.
    fn run_batch<B, S>(
        &self,
        operation: &'static str,
        docs: &mut [Document],
        build: B,
        settle: S,
    ) where
        B: Fn(&Document) -> Result<BulkOp>,
        S: Fn(&mut Document, BulkOp) -> Result<()>,
    {
        let mut index = Vec::with_capacity(docs.len());
        let mut ops = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter_mut().enumerate() {
            if doc.is_faulted() {
                continue;
            }
            match build(doc) {
                Ok(op) => {
                    index.push(i);
                    ops.push(op);
                }
                Err(fault) => self.fault(operation, doc, fault),
            }
        }
        if ops.is_empty() {
            return;
        }

        debug!(target: "docstore::store", operation, items = ops.len(), "Submitting batch");
        let aggregate = self.bucket.execute_batch(&mut ops).err();
        if let Some(e) = &aggregate {
            warn!(target: "docstore::store", operation, error = %e, "Batch reported an error");
        }

        for (op, i) in ops.into_iter().zip(index) {
            let doc = &mut docs[i];
            let err = match &op.err {
                Some(e) => Some(e.clone()),
                None if op.executed => None,
                // The item never ran, so the batch-level failure is its outcome.
                None => Some(match &aggregate {
                    Some(e) if !e.is_aggregate() => e.clone(),
                    _ => BucketError::Other("not executed by the batch".to_string()),
                }),
            };
            match err {
                Some(e) => {
                    let fault = classify(&e, OpCategory::from(op.kind), &op.key);
                    self.fault(operation, doc, fault);
                }
                None => {
                    if let Err(fault) = settle(doc, op) {
                        self.fault(operation, doc, fault);
                    }
                }
            }
        }
    }

    /// Run one single-item collaborator call and record its CAS
    fn run_one<F>(&self, operation: &'static str, doc: &mut Document, category: OpCategory, call: F)
    where
        F: FnOnce(&dyn Bucket, &str) -> std::result::Result<Cas, BucketError>,
    {
        let key = doc.key();
        match call(self.bucket.as_ref(), &key) {
            Ok(cas) => doc.meta_mut().cas = Some(cas),
            Err(e) => {
                let fault = classify(&e, category, &key);
                self.fault(operation, doc, fault);
            }
        }
    }
}

/// Encode a document for storage
///
/// A payload that cannot be encoded is the caller's error and never
/// reaches the collaborator.
fn encode(doc: &Document) -> Result<Vec<u8>> {
    wire::encode(doc).map_err(|e| {
        Fault::invalid_arguments(format!("cannot encode document '{}': {}", doc.key(), e))
    })
}

/// Record the CAS a write returned
fn record_cas(doc: &mut Document, op: BulkOp) -> Result<()> {
    doc.meta_mut().cas = Some(op.cas);
    Ok(())
}

/// TTL is write-only; nothing readable comes back from the server
fn clear_ttl(docs: &mut [Document]) {
    for doc in docs {
        doc.meta_mut().ttl = None;
    }
}

/// Decode stored bytes into `doc` and record the CAS they were read at
fn absorb(doc: &mut Document, bytes: &[u8], cas: Cas) -> Result<()> {
    wire::decode_into(bytes, doc).map_err(|e| {
        Fault::internal(format!("cannot decode document '{}': {}", doc.key(), e))
    })?;
    doc.meta_mut().cas = Some(cas);
    Ok(())
}

impl Database for DocumentStore {
    fn new_row(&self, id: &str) -> Document {
        Document::new(id)
    }

    fn new_query(&self, statement: &str) -> Query {
        Query::new(statement)
    }

    fn get_name(&self) -> String {
        self.name.read().clone()
    }

    fn set_name(&self, name: &str) -> Result<()> {
        *self.name.write() = name.to_string();
        Ok(())
    }

    fn create(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.create_many(inputs)
    }

    fn create_one(&self, input: Input) -> Document {
        self.create_single(input)
    }

    fn read(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.read_many(inputs)
    }

    fn read_one(&self, input: Input) -> Document {
        self.read_single(input, false)
    }

    fn read_one_with_type<T: DeserializeOwned>(&self, input: Input, out: &mut T) -> Document {
        self.read_typed(input, out)
    }

    fn replace(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.replace_many(inputs)
    }

    fn replace_one(&self, input: Input) -> Document {
        self.replace_single(input)
    }

    fn upsert(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.upsert_many(inputs)
    }

    fn upsert_one(&self, input: Input) -> Document {
        self.upsert_single(input)
    }

    fn update(&self, inputs: Vec<Input>) -> BulkOutcome {
        BulkOutcome::new(inputs.into_iter().map(|i| self.update_one(i)).collect())
    }

    fn update_one(&self, _input: Input) -> Document {
        Document::faulted(Fault::unimplemented("update"))
    }

    fn destroy(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.destroy_many(inputs)
    }

    fn destroy_one(&self, input: Input) -> Document {
        self.destroy_single(input)
    }

    fn touch(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.touch_many(inputs)
    }

    fn touch_one(&self, input: Input) -> Document {
        self.touch_single(input)
    }

    fn unlock(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.unlock_many(inputs)
    }

    fn unlock_one(&self, input: Input) -> Document {
        self.unlock_single(input)
    }

    fn exec(&self, query: &Query) -> Result<QueryResult> {
        self.execute(query)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.bucket.close() {
            Ok(()) => info!(
                target: "docstore::store",
                bucket = %self.bucket.name(),
                "Closed document store"
            ),
            Err(e) => warn!(
                target: "docstore::store",
                bucket = %self.bucket.name(),
                error = %e,
                "Closing bucket failed"
            ),
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("name", &*self.name.read())
            .field("host", &self.host)
            .field("bucket", &self.bucket.name())
            .field("max_query_rows", &self.max_query_rows)
            .field("closed", &self.is_closed())
            .finish()
    }
}
