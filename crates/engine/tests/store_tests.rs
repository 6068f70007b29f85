//! Integration tests for DocumentStore item operations
//!
//! Every test drives a store opened through a registry against the
//! in-memory collaborator, and inspects the bucket through a second handle
//! on the same cluster.

use docstore_engine::{
    Bucket, Cas, ClusterRegistry, Database, Document, DocumentStore, Fault, FaultKind, Input,
    MemoryBucket, MemoryConnector, Payload, StoreConfig, CAS, CREATEDON, LOCK,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const HOST: &str = "mem://store-tests";
const BUCKET: &str = "docs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup() -> (DocumentStore, MemoryBucket) {
    init_tracing();
    let connector = Arc::new(MemoryConnector::new());
    let registry = ClusterRegistry::new(connector.clone());
    let store = DocumentStore::open(&registry, &StoreConfig::new(HOST, BUCKET)).unwrap();
    let bucket = connector.cluster(HOST).bucket(BUCKET);
    (store, bucket)
}

fn user_row(id: &str, name: &str) -> Document {
    let mut doc = Document::new(id);
    doc.set_data(&User {
        name: name.to_string(),
        age: 30,
    })
    .unwrap();
    doc
}

/// A `user` row carrying only identity and a CAS
fn with_cas(id: &str, cas: Cas) -> Document {
    let mut doc = Document::new(id);
    doc.set_type("user");
    doc.set_meta(CAS, cas);
    doc
}

fn kind(doc: &Document) -> Option<FaultKind> {
    doc.fault().map(Fault::kind)
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn test_create_one_derives_key_from_type_and_id() {
    let (store, bucket) = setup();

    let created = store.create_one(Input::Row(user_row("u1", "ada")));
    assert!(!created.is_faulted(), "{:?}", created.fault());
    assert_eq!(created.key(), "user::u1");
    assert!(!created.cas().is_none());
    assert_eq!(bucket.len(), 1);

    let read = store.read_one(Input::key("user::u1"));
    assert!(!read.is_faulted());
    assert_eq!(read.id(), "u1");
    assert_eq!(read.doc_type(), "user");
}

#[test]
fn test_explicit_key_wins() {
    let (store, _bucket) = setup();

    let mut doc = user_row("u1", "ada");
    doc.set_key("custom-key");
    let created = store.create_one(Input::Row(doc));
    assert_eq!(created.key(), "custom-key");

    assert!(!store.read_one(Input::key("custom-key")).is_faulted());
    assert_eq!(
        kind(&store.read_one(Input::key("user::u1"))),
        Some(FaultKind::NotFound)
    );
}

#[test]
fn test_create_twice_faults_already_exists() {
    let (store, _bucket) = setup();

    assert!(!store.create_one(Input::Row(user_row("u1", "ada"))).is_faulted());
    let second = store.create_one(Input::Row(user_row("u1", "bob")));
    assert_eq!(kind(&second), Some(FaultKind::AlreadyExists));
    assert_eq!(
        second.fault(),
        Some(&Fault::AlreadyExists {
            key: "user::u1".to_string()
        })
    );

    let mut out = User {
        name: String::new(),
        age: 0,
    };
    store.read_one_with_type(Input::key("user::u1"), &mut out);
    assert_eq!(out.name, "ada");
}

#[test]
fn test_create_stamps_timestamps() {
    let (store, _bucket) = setup();

    let created = store.create_one(Input::Row(user_row("u1", "ada")));
    let created_on = created.created_on().unwrap();
    assert_eq!(created.updated_on(), Some(created_on));

    let read = store.read_one(Input::key("user::u1"));
    assert_eq!(read.created_on(), Some(created_on));
    assert_eq!(read.updated_on(), Some(created_on));
}

#[test]
fn test_create_one_plain_value_gets_generated_id() {
    let (store, bucket) = setup();

    let user = User {
        name: "ada".to_string(),
        age: 36,
    };
    let created = store.create_one(Input::other(&user));
    assert!(!created.is_faulted(), "{:?}", created.fault());
    assert_eq!(created.doc_type(), "user");
    assert_eq!(created.id().len(), 36);
    assert_eq!(bucket.len(), 1);

    let mut out = User {
        name: String::new(),
        age: 0,
    };
    let read = store.read_one_with_type(Input::key(created.key()), &mut out);
    assert!(!read.is_faulted());
    assert_eq!(out, user);
}

#[test]
fn test_create_one_from_key_stores_string() {
    let (store, _bucket) = setup();

    let created = store.create_one(Input::key("hello"));
    assert!(!created.is_faulted());
    assert_eq!(created.doc_type(), "string");

    let mut out = String::new();
    store.read_one_with_type(Input::key(created.key()), &mut out);
    assert_eq!(out, "hello");
}

#[test]
fn test_bulk_create_faults_only_unsupported_input() {
    let (store, bucket) = setup();

    let outcome = store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::unsupported::<u8>(),
        Input::Row(user_row("u2", "bob")),
    ]);

    assert!(!outcome.ok);
    assert_eq!(outcome.len(), 3);
    assert!(!outcome.documents[0].is_faulted());
    assert_eq!(kind(&outcome.documents[1]), Some(FaultKind::InvalidArguments));
    assert!(!outcome.documents[2].is_faulted());
    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket.batch_count(), 1);

    let faulted: Vec<usize> = outcome.faulted().map(|(i, _)| i).collect();
    assert_eq!(faulted, vec![1]);
}

#[test]
fn test_bulk_create_reports_existing_keys_per_item() {
    let (store, _bucket) = setup();

    store.create_one(Input::Row(user_row("u2", "first")));
    let outcome = store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
        Input::Row(user_row("u3", "cy")),
    ]);

    assert!(!outcome.ok);
    assert!(!outcome.documents[0].is_faulted());
    assert_eq!(kind(&outcome.documents[1]), Some(FaultKind::AlreadyExists));
    assert!(!outcome.documents[2].is_faulted());
}

#[test]
fn test_create_oversized_value_faults_too_big() {
    let (store, bucket) = setup();
    bucket.set_max_value_size(64);

    let mut doc = Document::new("big");
    doc.set_data(&"x".repeat(256)).unwrap();
    let created = store.create_one(Input::Row(doc));
    assert_eq!(kind(&created), Some(FaultKind::TooBig));
    assert!(bucket.is_empty());
}

#[test]
fn test_empty_key_faults_invalid_arguments() {
    let (store, _bucket) = setup();

    assert_eq!(
        kind(&store.read_one(Input::key(""))),
        Some(FaultKind::InvalidArguments)
    );
    assert_eq!(
        kind(&store.destroy_one(Input::key(""))),
        Some(FaultKind::InvalidArguments)
    );
}

// ============================================================================
// Read
// ============================================================================

#[test]
fn test_round_trip_keeps_payload_bytes() {
    let (store, _bucket) = setup();

    let raw = br#"{"z": 1,   "a": [true, null, 2.50]}"#.to_vec();
    let mut doc = Document::new("raw-1");
    doc.set_type("blob");
    doc.set_payload(Payload::Raw(raw.clone()));
    let created = store.create_one(Input::Row(doc));
    assert!(!created.is_faulted());

    let read = store.read_one(Input::key("blob::raw-1"));
    assert!(!read.is_faulted());
    assert_eq!(read.data().as_bytes(), Some(raw.as_slice()));

    let destroyed = store.destroy_one(Input::key("blob::raw-1"));
    assert!(!destroyed.is_faulted());
    assert!(!destroyed.cas().is_none());
    assert_ne!(destroyed.cas(), created.cas());
    assert_eq!(
        kind(&store.read_one(Input::key("blob::raw-1"))),
        Some(FaultKind::NotFound)
    );
}

#[test]
fn test_read_one_with_type_decodes_payload() {
    let (store, _bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut out = User {
        name: String::new(),
        age: 0,
    };
    let read = store.read_one_with_type(Input::key("user::u1"), &mut out);
    assert!(!read.is_faulted());
    assert_eq!(out.name, "ada");
    assert_eq!(out.age, 30);
    assert!(matches!(read.data(), Payload::Json(_)));
}

#[test]
fn test_read_one_with_type_mismatch_faults_internal() {
    let (store, _bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut out: Vec<u32> = Vec::new();
    let read = store.read_one_with_type(Input::key("user::u1"), &mut out);
    assert_eq!(kind(&read), Some(FaultKind::Internal));
    assert!(out.is_empty());
}

#[test]
fn test_read_missing_faults_not_found() {
    let (store, _bucket) = setup();

    let read = store.read_one(Input::display(&42));
    assert_eq!(
        read.fault(),
        Some(&Fault::NotFound {
            key: "42".to_string()
        })
    );
}

#[test]
fn test_bulk_read_uses_one_batch() {
    let (store, bucket) = setup();
    store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);
    let before = bucket.batch_count();

    let outcome = store.read(vec![
        Input::key("user::u1"),
        Input::key("user::missing"),
        Input::key("user::u2"),
    ]);
    assert_eq!(bucket.batch_count(), before + 1);
    assert!(!outcome.ok);
    assert_eq!(outcome.documents[0].id(), "u1");
    assert_eq!(kind(&outcome.documents[1]), Some(FaultKind::NotFound));
    assert_eq!(outcome.documents[2].id(), "u2");
}

#[test]
fn test_bulk_read_with_lock_reads_individually() {
    let (store, bucket) = setup();
    store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);
    let before = bucket.batch_count();

    let mut locked = Document::new("u1");
    locked.set_type("user");
    locked.set_lock(5);
    let outcome = store.read(vec![Input::Row(locked), Input::key("user::u2")]);

    assert!(outcome.ok);
    assert_eq!(bucket.batch_count(), before);

    // The first item is now locked.
    let again = store.read_one(Input::key("user::u1"));
    assert_eq!(again.cas(), Cas::new(u64::MAX));
}

// ============================================================================
// Replace / Upsert
// ============================================================================

#[test]
fn test_replace_with_stale_cas_faults_locked() {
    let (store, _bucket) = setup();
    let created = store.create_one(Input::Row(user_row("u1", "ada")));

    let mut first = user_row("u1", "first");
    first.set_meta(CAS, created.cas());
    let replaced = store.replace_one(Input::Row(first));
    assert!(!replaced.is_faulted());
    assert_ne!(replaced.cas(), created.cas());

    let mut stale = user_row("u1", "stale");
    stale.set_meta(CAS, created.cas());
    let conflict = store.replace_one(Input::Row(stale));
    assert_eq!(kind(&conflict), Some(FaultKind::Locked));

    let mut out = User {
        name: String::new(),
        age: 0,
    };
    store.read_one_with_type(Input::key("user::u1"), &mut out);
    assert_eq!(out.name, "first");
}

#[test]
fn test_replace_missing_faults_not_found() {
    let (store, _bucket) = setup();
    let replaced = store.replace_one(Input::Row(user_row("nobody", "x")));
    assert_eq!(kind(&replaced), Some(FaultKind::NotFound));
}

#[test]
fn test_replace_keeps_created_on_and_moves_updated_on() {
    let (store, _bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let read = store.read_one(Input::key("user::u1"));
    let created_on = read.created_on().unwrap();
    std::thread::sleep(Duration::from_millis(2));
    let replaced = store.replace_one(Input::Row(read));
    assert!(!replaced.is_faulted());
    assert_eq!(replaced.created_on(), Some(created_on));
    assert!(replaced.updated_on().unwrap() > created_on);
}

#[test]
fn test_bulk_replace_mixed_outcomes() {
    let (store, _bucket) = setup();
    store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);

    let mut stale = user_row("u2", "stale");
    stale.set_meta(CAS, 1u64 << 40);
    let outcome = store.replace(vec![
        Input::Row(user_row("u1", "ada2")),
        Input::Row(stale),
        Input::Row(user_row("u3", "ghost")),
    ]);

    assert!(!outcome.ok);
    assert!(!outcome.documents[0].is_faulted());
    assert_eq!(kind(&outcome.documents[1]), Some(FaultKind::Locked));
    assert_eq!(kind(&outcome.documents[2]), Some(FaultKind::NotFound));
}

#[test]
fn test_upsert_creates_then_overwrites() {
    let (store, bucket) = setup();

    let first = store.upsert_one(Input::Row(user_row("u1", "ada")));
    assert!(!first.is_faulted());
    let created_on = first.created_on().unwrap();
    assert_eq!(bucket.len(), 1);

    let read = store.read_one(Input::key("user::u1"));
    let mut doc = user_row("u1", "bob");
    doc.set_meta(CREATEDON, read.created_on().unwrap());
    // A stale CAS is ignored.
    doc.set_meta(CAS, 12345u64);
    let second = store.upsert_one(Input::Row(doc));
    assert!(!second.is_faulted());
    assert_eq!(second.created_on(), Some(created_on));
    assert_eq!(bucket.len(), 1);
}

#[test]
fn test_update_is_unimplemented() {
    let (store, bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let one = store.update_one(Input::key("user::u1"));
    assert_eq!(kind(&one), Some(FaultKind::Unimplemented));

    let outcome = store.update(vec![Input::key("user::u1"), Input::key("user::u2")]);
    assert!(!outcome.ok);
    assert!(outcome
        .documents
        .iter()
        .all(|d| kind(d) == Some(FaultKind::Unimplemented)));
    assert_eq!(bucket.batch_count(), 0);
}

// ============================================================================
// Lock / Touch / Unlock
// ============================================================================

#[test]
fn test_lock_is_enforced_until_unlocked() {
    let (store, _bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut request = Document::new("u1");
    request.set_type("user");
    request.set_meta(LOCK, 10);
    let locked = store.read_one(Input::Row(request));
    assert!(!locked.is_faulted());
    let lock_cas = locked.cas();

    // A second locking read is refused.
    let mut again = Document::new("u1");
    again.set_type("user");
    again.set_lock(10);
    assert_eq!(
        kind(&store.read_one(Input::Row(again))),
        Some(FaultKind::Locked)
    );

    // Writes without the lock CAS are refused.
    assert_eq!(
        kind(&store.replace_one(Input::Row(user_row("u1", "x")))),
        Some(FaultKind::Locked)
    );
    assert_eq!(
        kind(&store.touch_one(Input::key("user::u1"))),
        Some(FaultKind::Locked)
    );
    assert_eq!(
        kind(&store.upsert_one(Input::Row(user_row("u1", "x")))),
        Some(FaultKind::Locked)
    );

    let mut unlock = Document::new("u1");
    unlock.set_type("user");
    unlock.set_meta(CAS, lock_cas);
    assert!(!store.unlock_one(Input::Row(unlock)).is_faulted());

    assert!(!store
        .replace_one(Input::Row(user_row("u1", "free")))
        .is_faulted());
}

#[test]
fn test_lock_holder_can_replace() {
    let (store, _bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut request = Document::new("u1");
    request.set_type("user");
    request.set_lock(10);
    let mut locked = store.read_one(Input::Row(request));
    locked.set_data(&User {
        name: "holder".to_string(),
        age: 1,
    })
    .unwrap();

    let replaced = store.replace_one(Input::Row(locked));
    assert!(!replaced.is_faulted(), "{:?}", replaced.fault());
    assert!(!store
        .replace_one(Input::Row(user_row("u1", "other")))
        .is_faulted());
}

#[test]
fn test_unlock_without_lock_faults_locked() {
    let (store, _bucket) = setup();
    let created = store.create_one(Input::Row(user_row("u1", "ada")));

    let mut unlock = Document::new("u1");
    unlock.set_type("user");
    unlock.set_meta(CAS, created.cas());
    assert_eq!(
        kind(&store.unlock_one(Input::Row(unlock))),
        Some(FaultKind::Locked)
    );
}

#[test]
fn test_lock_expires() {
    let (store, bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut request = Document::new("u1");
    request.set_type("user");
    request.set_lock(2);
    assert!(!store.read_one(Input::Row(request)).is_faulted());

    bucket.advance_clock(Duration::from_secs(3));
    assert!(!store
        .replace_one(Input::Row(user_row("u1", "later")))
        .is_faulted());
}

#[test]
fn test_touch_extends_expiry_and_stamps_updated_on() {
    let (store, bucket) = setup();

    let mut doc = user_row("u1", "ada");
    doc.set_expiry(10);
    let created = store.create_one(Input::Row(doc));
    assert!(created.meta().ttl.is_none());

    let mut touch = Document::new("u1");
    touch.set_type("user");
    touch.set_expiry(100);
    let touched = store.touch_one(Input::Row(touch));
    assert!(!touched.is_faulted());
    assert!(touched.updated_on().is_some());
    assert!(touched.meta().ttl.is_none());
    assert_ne!(touched.cas(), created.cas());

    bucket.advance_clock(Duration::from_secs(50));
    assert!(!store.read_one(Input::key("user::u1")).is_faulted());
    bucket.advance_clock(Duration::from_secs(60));
    assert_eq!(
        kind(&store.read_one(Input::key("user::u1"))),
        Some(FaultKind::NotFound)
    );
}

#[test]
fn test_bulk_touch_per_item_outcomes() {
    let (store, bucket) = setup();
    let outcome = store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);
    let cas1 = outcome.documents[0].cas();

    let mut first = with_cas("u1", cas1);
    first.set_expiry(5);
    let mut wrong = with_cas("u2", Cas::new(1 << 40));
    wrong.set_expiry(5);
    let touched = store.touch(vec![
        Input::Row(first),
        Input::Row(wrong),
        Input::key("user::u3"),
    ]);

    assert!(!touched.ok);
    let ok = &touched.documents[0];
    assert!(!ok.is_faulted());
    assert!(!ok.cas().is_none());
    assert_ne!(ok.cas(), cas1);
    assert!(ok.updated_on().is_some());
    assert!(ok.meta().ttl.is_none());
    assert_eq!(kind(&touched.documents[1]), Some(FaultKind::Locked));
    assert_eq!(kind(&touched.documents[2]), Some(FaultKind::NotFound));

    bucket.advance_clock(Duration::from_secs(6));
    assert_eq!(
        kind(&store.read_one(Input::key("user::u1"))),
        Some(FaultKind::NotFound)
    );
    assert!(!store.read_one(Input::key("user::u2")).is_faulted());
}

#[test]
fn test_bulk_unlock_per_item_outcomes() {
    let (store, _bucket) = setup();
    store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);

    let mut lock_cas = Vec::new();
    for id in ["u1", "u2"] {
        let mut request = Document::new(id);
        request.set_type("user");
        request.set_lock(10);
        let locked = store.read_one(Input::Row(request));
        assert!(!locked.is_faulted());
        lock_cas.push(locked.cas());
    }

    let unlocked = store.unlock(vec![
        Input::Row(with_cas("u1", lock_cas[0])),
        Input::Row(with_cas("u2", Cas::new(lock_cas[1].as_u64() + 1000))),
        Input::Row(with_cas("u3", lock_cas[0])),
    ]);

    assert!(!unlocked.ok);
    assert!(!unlocked.documents[0].is_faulted());
    assert_eq!(unlocked.documents[0].cas(), lock_cas[0]);
    assert_eq!(kind(&unlocked.documents[1]), Some(FaultKind::Locked));
    assert_eq!(kind(&unlocked.documents[2]), Some(FaultKind::NotFound));

    assert!(!store
        .replace_one(Input::Row(user_row("u1", "free")))
        .is_faulted());
    assert_eq!(
        kind(&store.replace_one(Input::Row(user_row("u2", "held")))),
        Some(FaultKind::Locked)
    );
}

#[test]
fn test_ttl_expires_documents() {
    let (store, bucket) = setup();

    let mut doc = user_row("u1", "ada");
    doc.set_expiry(10);
    store.create(vec![Input::Row(doc), Input::Row(user_row("u2", "bob"))]);

    bucket.advance_clock(Duration::from_secs(11));
    assert_eq!(
        kind(&store.read_one(Input::key("user::u1"))),
        Some(FaultKind::NotFound)
    );
    assert!(!store.read_one(Input::key("user::u2")).is_faulted());
}

// ============================================================================
// Destroy
// ============================================================================

#[test]
fn test_destroy_with_stale_cas_faults_locked() {
    let (store, bucket) = setup();
    store.create_one(Input::Row(user_row("u1", "ada")));

    let mut stale = Document::new("u1");
    stale.set_type("user");
    stale.set_meta(CAS, 999_999u64);
    assert_eq!(
        kind(&store.destroy_one(Input::Row(stale))),
        Some(FaultKind::Locked)
    );
    assert_eq!(bucket.len(), 1);
}

#[test]
fn test_bulk_destroy() {
    let (store, bucket) = setup();
    store.create(vec![
        Input::Row(user_row("u1", "ada")),
        Input::Row(user_row("u2", "bob")),
    ]);

    let outcome = store.destroy(vec![
        Input::key("user::u1"),
        Input::key("user::u2"),
        Input::key("user::u3"),
    ]);
    assert!(!outcome.ok);
    assert!(!outcome.documents[0].is_faulted());
    assert!(!outcome.documents[1].is_faulted());
    assert_eq!(kind(&outcome.documents[2]), Some(FaultKind::NotFound));
    assert!(bucket.is_empty());
}

// ============================================================================
// Closed store
// ============================================================================

#[test]
fn test_operations_after_close_fault_internal() {
    let (store, _bucket) = setup();
    store.close();
    store.close();
    assert!(store.is_closed());

    let created = store.create_one(Input::Row(user_row("u1", "ada")));
    assert_eq!(kind(&created), Some(FaultKind::Internal));

    let outcome = store.create(vec![
        Input::Row(user_row("u2", "bob")),
        Input::Row(user_row("u3", "cy")),
    ]);
    assert!(!outcome.ok);
    assert!(outcome
        .documents
        .iter()
        .all(|d| kind(d) == Some(FaultKind::Internal)));
}

#[test]
fn test_bulk_conditional_writes_after_close_fault_internal() {
    let (store, bucket) = setup();
    let created = store.create_one(Input::Row(user_row("u1", "ada")));
    let cas = created.cas();
    let stored = bucket.get("user::u1").unwrap().value;
    store.close();

    let mut replacement = user_row("u1", "bob");
    replacement.set_meta(CAS, cas);
    let outcomes = [
        ("replace", store.replace(vec![Input::Row(replacement)])),
        ("destroy", store.destroy(vec![Input::Row(with_cas("u1", cas))])),
        ("touch", store.touch(vec![Input::Row(with_cas("u1", cas))])),
        ("unlock", store.unlock(vec![Input::Row(with_cas("u1", cas))])),
    ];
    for (operation, outcome) in &outcomes {
        assert!(!outcome.ok, "{} reported success", operation);
        assert_eq!(outcome.len(), 1);
        assert_eq!(
            kind(&outcome.documents[0]),
            Some(FaultKind::Internal),
            "{}",
            operation
        );
    }

    let fetched = bucket.get("user::u1").unwrap();
    assert_eq!(fetched.value, stored);
    assert_eq!(fetched.cas, cas);
}
