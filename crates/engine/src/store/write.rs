//! Replace, upsert, touch and unlock
//!
//! All four follow the same path: normalize, stamp, submit, clear TTL.
//! Touch stamps `UPDATEDON` on the returned metadata only; the stored
//! body is not rewritten.

use chrono::Utc;

use docstore_bucket::BulkOp;
use docstore_core::Document;

use super::{clear_ttl, encode, record_cas, DocumentStore};
use crate::classify::OpCategory;
use crate::input::{normalize, Input};
use crate::outcome::BulkOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Replace,
    Upsert,
    Touch,
    Unlock,
}

impl Mutation {
    fn operation(self) -> &'static str {
        match self {
            Mutation::Replace => "replace",
            Mutation::Upsert => "upsert",
            Mutation::Touch => "touch",
            Mutation::Unlock => "unlock",
        }
    }

    fn stamp(self, doc: &mut Document, now: chrono::DateTime<Utc>) {
        let meta = doc.meta_mut();
        match self {
            Mutation::Replace | Mutation::Touch => meta.updated_on = Some(now),
            Mutation::Upsert => {
                meta.updated_on = Some(now);
                if meta.created_on.is_none() {
                    meta.created_on = Some(now);
                }
            }
            Mutation::Unlock => {}
        }
    }

    fn descriptor(self, doc: &Document) -> crate::Result<BulkOp> {
        let key = doc.key();
        let meta = doc.meta();
        Ok(match self {
            Mutation::Replace => {
                BulkOp::replace(key, encode(doc)?, meta.cas_or_none(), meta.ttl_or_zero())
            }
            Mutation::Upsert => BulkOp::upsert(key, encode(doc)?, meta.ttl_or_zero()),
            Mutation::Touch => BulkOp::touch(key, meta.cas_or_none(), meta.ttl_or_zero()),
            Mutation::Unlock => BulkOp::unlock(key, meta.cas_or_none()),
        })
    }
}

impl DocumentStore {
    fn mutate_many(&self, mutation: Mutation, inputs: Vec<Input>) -> BulkOutcome {
        let now = Utc::now();
        let mut docs: Vec<Document> = inputs.into_iter().map(normalize).collect();
        for doc in docs.iter_mut().filter(|d| !d.is_faulted()) {
            mutation.stamp(doc, now);
        }

        self.run_batch(
            mutation.operation(),
            &mut docs,
            |doc| mutation.descriptor(doc),
            record_cas,
        );
        clear_ttl(&mut docs);
        BulkOutcome::new(docs)
    }

    fn mutate_single(&self, mutation: Mutation, input: Input) -> Document {
        let mut doc = normalize(input);
        if doc.is_faulted() {
            return doc;
        }
        mutation.stamp(&mut doc, Utc::now());

        match mutation.descriptor(&doc) {
            Ok(op) => {
                self.run_one(mutation.operation(), &mut doc, OpCategory::Mutate, |bucket, key| {
                    match mutation {
                        Mutation::Replace => bucket.replace(key, &op.value, op.cas, op.expiry),
                        Mutation::Upsert => bucket.upsert(key, &op.value, op.expiry),
                        Mutation::Touch => bucket.touch(key, op.cas, op.expiry),
                        Mutation::Unlock => bucket.unlock(key, op.cas),
                    }
                });
            }
            Err(fault) => self.fault(mutation.operation(), &mut doc, fault),
        }
        doc.meta_mut().ttl = None;
        doc
    }

    pub(crate) fn replace_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.mutate_many(Mutation::Replace, inputs)
    }

    pub(crate) fn replace_single(&self, input: Input) -> Document {
        self.mutate_single(Mutation::Replace, input)
    }

    pub(crate) fn upsert_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.mutate_many(Mutation::Upsert, inputs)
    }

    pub(crate) fn upsert_single(&self, input: Input) -> Document {
        self.mutate_single(Mutation::Upsert, input)
    }

    pub(crate) fn touch_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.mutate_many(Mutation::Touch, inputs)
    }

    pub(crate) fn touch_single(&self, input: Input) -> Document {
        self.mutate_single(Mutation::Touch, input)
    }

    pub(crate) fn unlock_many(&self, inputs: Vec<Input>) -> BulkOutcome {
        self.mutate_many(Mutation::Unlock, inputs)
    }

    pub(crate) fn unlock_single(&self, input: Input) -> Document {
        self.mutate_single(Mutation::Unlock, input)
    }
}
