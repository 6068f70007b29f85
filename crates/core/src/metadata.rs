//! Per-operation metadata
//!
//! Cross-cutting concerns (CAS, TTL, locking, timestamps, query knobs) ride
//! along with every document and query as metadata instead of widening each
//! operation's signature.
//!
//! ## Structure
//!
//! `Metadata` has a named field for every key the store understands, plus an
//! `extra` map for anything else. The string-keyed [`Metadata::set`] and
//! [`Metadata::get`] give the untyped view; values for known keys pass
//! through the coercion rules in [`crate::coerce`].
//!
//! ## Keys
//!
//! | Key | Field | In memory | At rest |
//! |-----|-------|-----------|---------|
//! | [`CAS`] | `cas` | [`Cas`] | not persisted |
//! | [`TTL`] | `ttl` | `u32` seconds | not persisted |
//! | [`LOCK`] | `lock` | `u32` seconds | not persisted |
//! | [`CREATEDON`] | `created_on` | `DateTime<Utc>` | `i64` nanoseconds |
//! | [`UPDATEDON`] | `updated_on` | `DateTime<Utc>` | `i64` nanoseconds |
//! | [`ADHOC`] | `adhoc` | `bool` | bool |
//! | [`CONSISTENCY`] | `consistency` | [`ScanConsistency`] | integer code |
//! | [`TIMEOUT`] | `timeout` | `Duration` | milliseconds |

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::cas::Cas;
use crate::coerce::{to_i64, to_u32, MetaValue};

/// Compare-and-swap token
pub const CAS: &str = "_cas";
/// Expiry in seconds (write-only)
pub const TTL: &str = "_ttl";
/// Lock duration in seconds; > 0 makes reads pessimistic
pub const LOCK: &str = "_lock";
/// Creation timestamp
pub const CREATEDON: &str = "_createdOn";
/// Last update timestamp
pub const UPDATEDON: &str = "_updatedOn";
/// Ad-hoc (non-prepared) query flag
pub const ADHOC: &str = "_adhoc";
/// Query scan consistency
pub const CONSISTENCY: &str = "_consistency";
/// Query timeout
pub const TIMEOUT: &str = "_timeout";

/// Scan consistency requested for a query
///
/// Codes match the collaborator's numeric consistency modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanConsistency {
    /// Return whatever the index has (fastest)
    NotBounded,
    /// Wait for all mutations up to the request
    RequestPlus,
    /// Wait for all mutations up to the statement
    StatementPlus,
}

impl ScanConsistency {
    /// Numeric code
    pub const fn code(&self) -> u8 {
        match self {
            ScanConsistency::NotBounded => 1,
            ScanConsistency::RequestPlus => 2,
            ScanConsistency::StatementPlus => 3,
        }
    }

    /// Parse a numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ScanConsistency::NotBounded),
            2 => Some(ScanConsistency::RequestPlus),
            3 => Some(ScanConsistency::StatementPlus),
            _ => None,
        }
    }

    fn coerce(value: &MetaValue) -> Option<Self> {
        match value {
            MetaValue::Consistency(c) => Some(*c),
            MetaValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                "not_bounded" => Some(ScanConsistency::NotBounded),
                "request_plus" => Some(ScanConsistency::RequestPlus),
                "statement_plus" => Some(ScanConsistency::StatementPlus),
                _ => None,
            },
            other => to_i64(other).and_then(Self::from_code),
        }
    }
}

/// Metadata attached to a document or query
///
/// Cloning is a shallow copy: the clone never aliases the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Compare-and-swap token
    pub cas: Option<Cas>,
    /// Expiry in seconds
    pub ttl: Option<u32>,
    /// Lock duration in seconds
    pub lock: Option<u32>,
    /// Creation time
    pub created_on: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_on: Option<DateTime<Utc>>,
    /// Ad-hoc query flag
    pub adhoc: Option<bool>,
    /// Query scan consistency
    pub consistency: Option<ScanConsistency>,
    /// Query timeout
    pub timeout: Option<Duration>,
    /// Keys with no dedicated field
    pub extra: BTreeMap<String, JsonValue>,
}

fn time_from(value: &MetaValue) -> Option<DateTime<Utc>> {
    match value {
        MetaValue::Time(t) => Some(*t),
        other => to_i64(other).map(|nanos| Utc.timestamp_nanos(nanos)),
    }
}

fn duration_from(value: &MetaValue) -> Option<Duration> {
    match value {
        MetaValue::Duration(d) => Some(*d),
        other => to_i64(other).map(|millis| Duration::from_millis(millis.max(0) as u64)),
    }
}

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value by key
    ///
    /// Known keys are coerced into their field type. A value of the wrong
    /// shape leaves the field absent.
    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) {
        let value = value.into();
        match key {
            CAS => self.cas = Cas::coerce(&value),
            TTL => self.ttl = to_u32(&value),
            LOCK => self.lock = to_u32(&value),
            CREATEDON => self.created_on = time_from(&value),
            UPDATEDON => self.updated_on = time_from(&value),
            ADHOC => {
                self.adhoc = match value {
                    MetaValue::Bool(b) => Some(b),
                    _ => None,
                }
            }
            CONSISTENCY => self.consistency = ScanConsistency::coerce(&value),
            TIMEOUT => self.timeout = duration_from(&value),
            _ => {
                self.extra.insert(key.to_string(), value.to_json());
            }
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<MetaValue> {
        match key {
            CAS => self.cas.map(MetaValue::Cas),
            TTL => self.ttl.map(MetaValue::from),
            LOCK => self.lock.map(MetaValue::from),
            CREATEDON => self.created_on.map(MetaValue::Time),
            UPDATEDON => self.updated_on.map(MetaValue::Time),
            ADHOC => self.adhoc.map(MetaValue::Bool),
            CONSISTENCY => self.consistency.map(MetaValue::Consistency),
            TIMEOUT => self.timeout.map(MetaValue::Duration),
            _ => self.extra.get(key).cloned().map(MetaValue::from),
        }
    }

    /// Remove a key, returning its previous value
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        let previous = self.get(key);
        match key {
            CAS => self.cas = None,
            TTL => self.ttl = None,
            LOCK => self.lock = None,
            CREATEDON => self.created_on = None,
            UPDATEDON => self.updated_on = None,
            ADHOC => self.adhoc = None,
            CONSISTENCY => self.consistency = None,
            TIMEOUT => self.timeout = None,
            _ => {
                self.extra.remove(key);
            }
        }
        previous
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All present keys, named fields first
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [
            (CAS, self.cas.is_some()),
            (TTL, self.ttl.is_some()),
            (LOCK, self.lock.is_some()),
            (CREATEDON, self.created_on.is_some()),
            (UPDATEDON, self.updated_on.is_some()),
            (ADHOC, self.adhoc.is_some()),
            (CONSISTENCY, self.consistency.is_some()),
            (TIMEOUT, self.timeout.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(k, _)| k.to_string())
        .collect();
        keys.extend(self.extra.keys().cloned());
        keys
    }

    /// Check if no key is present
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// CAS token, `Cas::NONE` when absent
    pub fn cas_or_none(&self) -> Cas {
        self.cas.unwrap_or(Cas::NONE)
    }

    /// TTL seconds, 0 when absent
    pub fn ttl_or_zero(&self) -> u32 {
        self.ttl.unwrap_or(0)
    }

    /// Lock seconds, 0 when absent
    pub fn lock_or_zero(&self) -> u32 {
        self.lock.unwrap_or(0)
    }

    /// Fill keys that are absent here from `src`
    ///
    /// Present keys are never overwritten.
    pub fn merge_from(&mut self, src: &Metadata) {
        fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if dst.is_none() {
                *dst = src.clone();
            }
        }
        fill(&mut self.cas, &src.cas);
        fill(&mut self.ttl, &src.ttl);
        fill(&mut self.lock, &src.lock);
        fill(&mut self.created_on, &src.created_on);
        fill(&mut self.updated_on, &src.updated_on);
        fill(&mut self.adhoc, &src.adhoc);
        fill(&mut self.consistency, &src.consistency);
        fill(&mut self.timeout, &src.timeout);
        for (k, v) in &src.extra {
            self.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Copy every key present in `src`, overwriting existing values
    pub fn overwrite_from(&mut self, src: &Metadata) {
        fn put<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                *dst = src.clone();
            }
        }
        put(&mut self.cas, &src.cas);
        put(&mut self.ttl, &src.ttl);
        put(&mut self.lock, &src.lock);
        put(&mut self.created_on, &src.created_on);
        put(&mut self.updated_on, &src.updated_on);
        put(&mut self.adhoc, &src.adhoc);
        put(&mut self.consistency, &src.consistency);
        put(&mut self.timeout, &src.timeout);
        for (k, v) in &src.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }

    /// JSON form stored alongside the document
    ///
    /// CAS, TTL and LOCK are request-scoped and are left out.
    pub fn to_persisted(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        for key in self.keys() {
            if matches!(key.as_str(), CAS | TTL | LOCK) {
                continue;
            }
            if let Some(value) = self.get(&key) {
                map.insert(key, value.to_json());
            }
        }
        map
    }

    /// Rebuild metadata from its stored JSON form
    pub fn from_persisted(map: Map<String, JsonValue>) -> Self {
        let mut meta = Metadata::new();
        for (key, value) in map {
            if matches!(key.as_str(), CAS | TTL | LOCK) {
                continue;
            }
            meta.set(&key, value);
        }
        meta
    }
}
