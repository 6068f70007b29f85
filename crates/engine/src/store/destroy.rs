use docstore_bucket::BulkOp;
use docstore_core::Document;

use super::{clear_ttl, record_cas, DocumentStore};
use crate::classify::OpCategory;
use crate::input::{normalize, Input};
use crate::outcome::BulkOutcome;

impl DocumentStore {
    pub(crate) fn destroy_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        let mut docs: Vec<Document> = inputs.into_iter().map(normalize).collect();
        self.run_batch(
            "destroy",
            &mut docs,
            |doc| Ok(BulkOp::remove(doc.key(), doc.meta().cas_or_none())),
            record_cas,
        );
        clear_ttl(&mut docs);
        BulkOutcome::new(docs)
    }

    pub(crate) fn destroy_single(&self, input: Input) -> Document {
        let mut doc = normalize(input);
        if doc.is_faulted() {
            return doc;
        }
        let cas = doc.meta().cas_or_none();
        self.run_one("destroy", &mut doc, OpCategory::Mutate, |bucket, key| {
            bucket.remove(key, cas)
        });
        doc.meta_mut().ttl = None;
        doc
    }
}
