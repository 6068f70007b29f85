use chrono::Utc;

use docstore_bucket::BulkOp;
use docstore_core::Document;

use super::{clear_ttl, encode, record_cas, DocumentStore};
use crate::classify::OpCategory;
use crate::input::{normalize, normalize_for_create, Input};
use crate::outcome::BulkOutcome;

fn stamp_created(doc: &mut Document, now: chrono::DateTime<Utc>) {
    let meta = doc.meta_mut();
    meta.created_on = Some(now);
    meta.updated_on = Some(now);
}

impl DocumentStore {
    pub(crate) fn create_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        let now = Utc::now();
        let mut docs: Vec<Document> = inputs.into_iter().map(normalize).collect();
        for doc in docs.iter_mut().filter(|d| !d.is_faulted()) {
            stamp_created(doc, now);
        }

        self.run_batch(
            "create",
            &mut docs,
            |doc| {
                let value = encode(doc)?;
                Ok(BulkOp::insert(doc.key(), value, doc.meta().ttl_or_zero()))
            },
            record_cas,
        );
        clear_ttl(&mut docs);
        BulkOutcome::new(docs)
    }

    pub(crate) fn create_single(&self, input: Input) -> Document {
        let mut doc = normalize_for_create(input);
        if doc.is_faulted() {
            return doc;
        }
        stamp_created(&mut doc, Utc::now());

        match encode(&doc) {
            Ok(value) => {
                let expiry = doc.meta().ttl_or_zero();
                self.run_one("create", &mut doc, OpCategory::Create, |bucket, key| {
                    bucket.insert(key, &value, expiry)
                });
            }
            Err(fault) => self.fault("create", &mut doc, fault),
        }
        doc.meta_mut().ttl = None;
        doc
    }
}
