use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use docstore_bucket::BulkOp;
use docstore_core::{Document, Fault, Payload};

use super::{absorb, DocumentStore};
use crate::classify::{classify, OpCategory};
use crate::input::{normalize, Input};
use crate::outcome::BulkOutcome;

impl DocumentStore {
    /// Plain or locking read of one normalized document
    fn fetch_into(&self, doc: &mut Document) {
        let key = doc.key();
        let lock = doc.meta().lock_or_zero();
        let fetched = if lock > 0 {
            self.bucket.get_and_lock(&key, lock)
        } else {
            self.bucket.get(&key)
        };
        let outcome = fetched
            .map_err(|e| classify(&e, OpCategory::Read, &key))
            .and_then(|f| absorb(doc, &f.value, f.cas));
        if let Err(fault) = outcome {
            self.fault("read", doc, fault);
        }
    }

    pub(crate) fn read_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        let mut docs: Vec<Document> = inputs.into_iter().map(normalize).collect();

        let locking = docs
            .iter()
            .any(|d| !d.is_faulted() && d.meta().lock_or_zero() > 0);
        if locking {
            // Locks are per item and cannot ride a uniform batch.
            debug!(target: "docstore::store", items = docs.len(), "Locking read, falling back to single reads");
            for doc in docs.iter_mut().filter(|d| !d.is_faulted()) {
                self.fetch_into(doc);
            }
        } else {
            self.run_batch(
                "read",
                &mut docs,
                |doc| Ok(BulkOp::get(doc.key())),
                |doc, op| absorb(doc, &op.value, op.cas),
            );
        }
        BulkOutcome::new(docs)
    }

    /// Read one input; with `typed` the payload is decoded as JSON
    pub(crate) fn read_single(&self, input: Input, typed: bool) -> Document {
        let mut doc = normalize(input);
        if doc.is_faulted() {
            return doc;
        }
        if typed {
            doc.set_payload(Payload::Json(JsonValue::Null));
        }
        self.fetch_into(&mut doc);
        doc
    }

    pub(crate) fn read_typed<T: DeserializeOwned>(&self, input: Input, out: &mut T) -> Document {
        let mut doc = self.read_single(input, true);
        if doc.is_faulted() {
            return doc;
        }
        match doc.decode_data::<T>() {
            Ok(value) => *out = value,
            Err(e) => {
                let fault = Fault::internal(format!(
                    "cannot decode payload of '{}': {}",
                    doc.key(),
                    e
                ));
                self.fault("read", &mut doc, fault);
            }
        }
        doc
    }
}
