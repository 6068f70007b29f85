//! Document model
//!
//! A `Document` is the unit of storage: identity, optional type tag,
//! payload, metadata, and an optional fault left behind by the last
//! operation on it.
//!
//! ## Key derivation
//!
//! ```text
//! explicit key set   -> key
//! type non-empty     -> type + "::" + id
//! otherwise          -> id
//! ```
//!
//! The composite form lets one bucket hold several logical collections
//! without key collisions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cas::Cas;
use crate::coerce::{to_u32, MetaValue};
use crate::error::{Fault, Result};
use crate::metadata::{Metadata, CREATEDON, UPDATEDON};

/// Separator between type and id in derived keys
pub const KEY_SEPARATOR: &str = "::";

/// Document payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No payload
    #[default]
    Empty,
    /// Decoded JSON value
    Json(JsonValue),
    /// Undecoded JSON bytes as read from the store
    Raw(Vec<u8>),
}

impl Payload {
    /// Check if there is no payload
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Raw bytes, if this payload was left undecoded
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Payload as a JSON value
    ///
    /// Raw bytes are parsed; an empty payload is `null`.
    pub fn to_json(&self) -> Result<JsonValue> {
        match self {
            Payload::Empty => Ok(JsonValue::Null),
            Payload::Json(v) => Ok(v.clone()),
            Payload::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Decode the payload into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Payload::Empty => Ok(serde_json::from_value(JsonValue::Null)?),
            Payload::Json(v) => Ok(serde_json::from_value(v.clone())?),
            Payload::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// Type tag inferred from a Rust type: last path segment, lower-cased
///
/// `my_app::model::User` becomes `user`; references and generic arguments
/// are ignored (`&Vec<User>` becomes `vec`).
pub fn type_tag_of<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let base = base.trim_start_matches('&').trim_start_matches("mut ");
    base.rsplit(KEY_SEPARATOR)
        .next()
        .unwrap_or(base)
        .to_ascii_lowercase()
}

/// A stored item plus its metadata and fault state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    key: Option<String>,
    id: String,
    doc_type: String,
    inferred_type: Option<String>,
    payload: Payload,
    meta: Metadata,
    fault: Option<Fault>,
}

impl Document {
    /// Create a document with the given identity
    pub fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create a document that is already faulted
    pub fn faulted(fault: Fault) -> Self {
        Document {
            fault: Some(fault),
            ..Default::default()
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Physical storage key
    pub fn key(&self) -> String {
        if let Some(key) = &self.key {
            return key.clone();
        }
        let doc_type = self.doc_type();
        if doc_type.is_empty() {
            self.id.clone()
        } else {
            let mut key = String::with_capacity(doc_type.len() + 2 + self.id.len());
            key.push_str(&doc_type);
            key.push_str(KEY_SEPARATOR);
            key.push_str(&self.id);
            key
        }
    }

    /// Override the storage key
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Explicitly set key, if any
    pub fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// External identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the external identity
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Type tag, falling back to the payload's inferred type
    pub fn doc_type(&self) -> String {
        if self.doc_type.is_empty() && !self.payload.is_empty() {
            if let Some(inferred) = &self.inferred_type {
                return inferred.clone();
            }
        }
        self.doc_type.clone()
    }

    /// Set the type tag
    pub fn set_type(&mut self, doc_type: impl Into<String>) {
        self.doc_type = doc_type.into();
    }

    // =========================================================================
    // Payload
    // =========================================================================

    /// Encode typed data as the payload
    ///
    /// Records the Rust type name as the inferred type tag.
    pub fn set_data<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<()> {
        self.payload = Payload::Json(serde_json::to_value(data)?);
        self.inferred_type = Some(type_tag_of::<T>());
        Ok(())
    }

    /// Payload
    pub fn data(&self) -> &Payload {
        &self.payload
    }

    /// Replace the payload
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Set the inferred type tag directly
    pub fn set_inferred_type(&mut self, tag: Option<String>) {
        self.inferred_type = tag;
    }

    /// Inferred type tag, if any
    pub fn inferred_type(&self) -> Option<&str> {
        self.inferred_type.as_deref()
    }

    /// Decode the payload into a typed value
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        self.payload.decode()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Metadata
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Mutable metadata
    pub fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    /// Shallow copy of the metadata
    pub fn metadata(&self) -> Metadata {
        self.meta.clone()
    }

    /// Replace the metadata
    pub fn set_metadata(&mut self, meta: Metadata) {
        self.meta = meta;
    }

    /// Set a metadata value by key
    pub fn set_meta(&mut self, key: &str, value: impl Into<MetaValue>) {
        self.meta.set(key, value);
    }

    /// Get a metadata value by key
    pub fn get_meta(&self, key: &str) -> Option<MetaValue> {
        self.meta.get(key)
    }

    /// CAS token, `Cas::NONE` when absent
    pub fn cas(&self) -> Cas {
        self.meta.cas_or_none()
    }

    /// Creation time
    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.meta.get(CREATEDON).and_then(|v| match v {
            MetaValue::Time(t) => Some(t),
            _ => None,
        })
    }

    /// Last update time
    pub fn updated_on(&self) -> Option<DateTime<Utc>> {
        self.meta.get(UPDATEDON).and_then(|v| match v {
            MetaValue::Time(t) => Some(t),
            _ => None,
        })
    }

    /// Set the expiry in seconds
    pub fn set_expiry(&mut self, seconds: u32) {
        self.meta.ttl = Some(seconds);
    }

    /// Set the lock duration; any integer type is accepted
    pub fn set_lock(&mut self, seconds: impl Into<MetaValue>) {
        self.meta.lock = to_u32(&seconds.into());
    }

    // =========================================================================
    // Fault state
    // =========================================================================

    /// Check if the last operation on this document failed
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Fault left by the last operation
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Mark the document faulted
    pub fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Consume the document, returning its fault
    pub fn into_fault(self) -> Option<Fault> {
        self.fault
    }
}
