use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use docstore_core::{Cas, QueryParams};

use super::rows::VecRows;
use crate::error::{BucketError, Result};
use crate::ops::BulkOp;
use crate::query::{QueryRequest, RowIterator};
use crate::traits::{execute_each, Bucket, Fetched};

/// Item size limit, matching the usual 20 MiB server default
pub const DEFAULT_MAX_VALUE_SIZE: usize = 20 * 1024 * 1024;

/// Longest lock a locking read can take, in seconds
pub const MAX_LOCK_TIME: u32 = 30;

#[derive(Debug, Clone)]
struct StoredItem {
    value: Vec<u8>,
    cas: u64,
    expires_at: Option<Instant>,
    locked_until: Option<Instant>,
}

impl StoredItem {
    fn new(value: &[u8], cas: u64, expires_at: Option<Instant>) -> Self {
        StoredItem {
            value: value.to_vec(),
            cas,
            expires_at,
            locked_until: None,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }

    fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.map_or(false, |t| now < t)
    }

    /// A locked item only accepts its own CAS; an unlocked one accepts
    /// its own CAS or none.
    fn check_cas(&self, cas: Cas, now: Instant) -> Result<()> {
        let matches = cas.as_u64() == self.cas;
        if self.is_locked(now) {
            if !matches {
                return Err(BucketError::KeyExists);
            }
        } else if !cas.is_none() && !matches {
            return Err(BucketError::KeyExists);
        }
        Ok(())
    }
}

/// State shared by every handle on one bucket
#[derive(Debug)]
pub(crate) struct SharedBucket {
    items: DashMap<String, StoredItem>,
    next_cas: AtomicU64,
    clock_offset_ms: AtomicU64,
    max_value_size: AtomicUsize,
    query_failure: Mutex<Option<BucketError>>,
    open_iterators: Arc<AtomicUsize>,
    batches: AtomicUsize,
}

impl SharedBucket {
    pub(crate) fn new(max_value_size: usize) -> Self {
        SharedBucket {
            items: DashMap::new(),
            next_cas: AtomicU64::new(1),
            clock_offset_ms: AtomicU64::new(0),
            max_value_size: AtomicUsize::new(max_value_size),
            query_failure: Mutex::new(None),
            open_iterators: Arc::new(AtomicUsize::new(0)),
            batches: AtomicUsize::new(0),
        }
    }

    fn now(&self) -> Instant {
        Instant::now() + Duration::from_millis(self.clock_offset_ms.load(Ordering::SeqCst))
    }

    fn next_cas(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::SeqCst)
    }

    fn expiry_at(now: Instant, expiry: u32) -> Option<Instant> {
        if expiry == 0 {
            None
        } else {
            Some(now + Duration::from_secs(expiry as u64))
        }
    }

    fn check_size(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.max_value_size.load(Ordering::SeqCst) {
            return Err(BucketError::ValueTooBig);
        }
        Ok(())
    }

    /// Run `f` on a live item, dropping it first if it has expired
    fn with_live<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut StoredItem, Instant) -> Result<R>,
    ) -> Result<R> {
        let now = self.now();
        match self.items.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if !occupied.get().is_live(now) {
                    occupied.remove();
                    return Err(BucketError::KeyNotFound);
                }
                f(occupied.get_mut(), now)
            }
            MapEntry::Vacant(_) => Err(BucketError::KeyNotFound),
        }
    }
}

/// Handle on an in-memory bucket
///
/// Obtained from [`super::MemoryCluster::bucket`] or through
/// `Cluster::open_bucket`. The test hooks (`advance_clock`,
/// `fail_next_query`, counters) act on the shared bucket state.
#[derive(Debug)]
pub struct MemoryBucket {
    name: String,
    shared: Arc<SharedBucket>,
    closed: AtomicBool,
}

impl MemoryBucket {
    /// Standalone bucket with no cluster
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_shared(name, Arc::new(SharedBucket::new(DEFAULT_MAX_VALUE_SIZE)))
    }

    pub(crate) fn from_shared(name: impl Into<String>, shared: Arc<SharedBucket>) -> Self {
        MemoryBucket {
            name: name.into(),
            shared,
            closed: AtomicBool::new(false),
        }
    }

    /// Move the bucket's clock forward, expiring items and locks
    pub fn advance_clock(&self, by: Duration) {
        self.shared
            .clock_offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Change the item size limit
    pub fn set_max_value_size(&self, bytes: usize) {
        self.shared.max_value_size.store(bytes, Ordering::SeqCst);
    }

    /// Make the next `execute_query` fail with `err`
    pub fn fail_next_query(&self, err: BucketError) {
        *self.shared.query_failure.lock() = Some(err);
    }

    /// Query iterators handed out and not yet closed
    pub fn open_iterators(&self) -> usize {
        self.shared.open_iterators.load(Ordering::SeqCst)
    }

    /// Batches submitted through `execute_batch`
    pub fn batch_count(&self) -> usize {
        self.shared.batches.load(Ordering::SeqCst)
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        let now = self.shared.now();
        self.shared
            .items
            .iter()
            .filter(|item| item.is_live(now))
            .count()
    }

    /// Check if there are no live items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if this handle was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BucketError::Closed);
        }
        Ok(())
    }
}

fn named_filters(params: &QueryParams) -> Vec<(String, JsonValue)> {
    match params {
        QueryParams::Named(map) => map
            .iter()
            .map(|(k, v)| (k.trim_start_matches('$').to_string(), v.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&self, key: &str, value: &[u8], expiry: u32) -> Result<Cas> {
        self.check_open()?;
        let shared = &self.shared;
        shared.check_size(value)?;
        let now = shared.now();
        let expires_at = SharedBucket::expiry_at(now, expiry);
        match shared.items.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Err(BucketError::KeyExists);
                }
                let cas = shared.next_cas();
                occupied.insert(StoredItem::new(value, cas, expires_at));
                Ok(Cas::new(cas))
            }
            MapEntry::Vacant(vacant) => {
                let cas = shared.next_cas();
                vacant.insert(StoredItem::new(value, cas, expires_at));
                Ok(Cas::new(cas))
            }
        }
    }

    fn get(&self, key: &str) -> Result<Fetched> {
        self.check_open()?;
        self.shared.with_live(key, |item, now| {
            let cas = if item.is_locked(now) {
                Cas::new(u64::MAX)
            } else {
                Cas::new(item.cas)
            };
            Ok(Fetched {
                value: item.value.clone(),
                cas,
            })
        })
    }

    fn get_and_lock(&self, key: &str, lock_time: u32) -> Result<Fetched> {
        self.check_open()?;
        let shared = &self.shared;
        shared.with_live(key, |item, now| {
            if item.is_locked(now) {
                return Err(BucketError::TemporaryFailure);
            }
            let secs = lock_time.clamp(1, MAX_LOCK_TIME);
            item.locked_until = Some(now + Duration::from_secs(secs as u64));
            item.cas = shared.next_cas();
            Ok(Fetched {
                value: item.value.clone(),
                cas: Cas::new(item.cas),
            })
        })
    }

    fn replace(&self, key: &str, value: &[u8], cas: Cas, expiry: u32) -> Result<Cas> {
        self.check_open()?;
        let shared = &self.shared;
        shared.check_size(value)?;
        shared.with_live(key, |item, now| {
            item.check_cas(cas, now)?;
            *item = StoredItem::new(value, shared.next_cas(), SharedBucket::expiry_at(now, expiry));
            Ok(Cas::new(item.cas))
        })
    }

    fn upsert(&self, key: &str, value: &[u8], expiry: u32) -> Result<Cas> {
        self.check_open()?;
        let shared = &self.shared;
        shared.check_size(value)?;
        let now = shared.now();
        let expires_at = SharedBucket::expiry_at(now, expiry);
        match shared.items.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.is_live(now) && current.is_locked(now) {
                    return Err(BucketError::KeyExists);
                }
                let cas = shared.next_cas();
                occupied.insert(StoredItem::new(value, cas, expires_at));
                Ok(Cas::new(cas))
            }
            MapEntry::Vacant(vacant) => {
                let cas = shared.next_cas();
                vacant.insert(StoredItem::new(value, cas, expires_at));
                Ok(Cas::new(cas))
            }
        }
    }

    fn remove(&self, key: &str, cas: Cas) -> Result<Cas> {
        self.check_open()?;
        let shared = &self.shared;
        let now = shared.now();
        match shared.items.entry(key.to_string()) {
            MapEntry::Occupied(occupied) => {
                if !occupied.get().is_live(now) {
                    occupied.remove();
                    return Err(BucketError::KeyNotFound);
                }
                occupied.get().check_cas(cas, now)?;
                occupied.remove();
                Ok(Cas::new(shared.next_cas()))
            }
            MapEntry::Vacant(_) => Err(BucketError::KeyNotFound),
        }
    }

    fn touch(&self, key: &str, cas: Cas, expiry: u32) -> Result<Cas> {
        self.check_open()?;
        let shared = &self.shared;
        shared.with_live(key, |item, now| {
            item.check_cas(cas, now)?;
            item.expires_at = SharedBucket::expiry_at(now, expiry);
            item.cas = shared.next_cas();
            Ok(Cas::new(item.cas))
        })
    }

    fn unlock(&self, key: &str, cas: Cas) -> Result<Cas> {
        self.check_open()?;
        self.shared.with_live(key, |item, now| {
            if !item.is_locked(now) || cas.as_u64() != item.cas {
                return Err(BucketError::KeyExists);
            }
            item.locked_until = None;
            Ok(Cas::new(item.cas))
        })
    }

    fn execute_batch(&self, ops: &mut [BulkOp]) -> Result<()> {
        self.check_open()?;
        self.shared.batches.fetch_add(1, Ordering::SeqCst);
        execute_each(self, ops)
    }

    fn execute_query(&self, request: &QueryRequest) -> Result<Box<dyn RowIterator>> {
        self.check_open()?;
        if let Some(err) = self.shared.query_failure.lock().take() {
            return Err(err);
        }
        if request.timeout == Some(Duration::ZERO) {
            return Err(BucketError::Timeout);
        }

        let now = self.shared.now();
        let filters = named_filters(&request.params);
        let mut rows: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for item in self.shared.items.iter() {
            if !item.is_live(now) {
                continue;
            }
            let doc: JsonValue = match serde_json::from_slice(&item.value) {
                Ok(doc) => doc,
                Err(_) => continue,
            };
            if !filters.iter().all(|(field, v)| doc.get(field) == Some(v)) {
                continue;
            }
            let mut row = serde_json::Map::new();
            row.insert(self.name.clone(), doc);
            let bytes = serde_json::to_vec(&JsonValue::Object(row))
                .map_err(|e| BucketError::Other(e.to_string()))?;
            rows.insert(item.key().clone(), bytes);
        }

        Ok(Box::new(VecRows::tracked(
            rows.into_values().collect(),
            Arc::clone(&self.shared.open_iterators),
        )))
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
