//! Persisted document format
//!
//! ```json
//! {
//!   "_uId":  "<identity>",
//!   "_type": "<type tag>",
//!   "data":  <payload>,
//!   "meta":  { "_createdOn": <nanos>, "_updatedOn": <nanos>, ... }
//! }
//! ```
//!
//! `data` is carried as raw JSON so a payload read back without a typed
//! destination is byte-for-byte what was written. Timestamps are integer
//! nanoseconds since epoch, never calendar values. CAS, TTL and LOCK are not
//! persisted: CAS comes from the collaborator on every read, TTL and LOCK
//! are request parameters.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value as JsonValue};

use crate::document::{Document, Payload};
use crate::error::{Error, Result};
use crate::metadata::Metadata;

#[derive(Serialize)]
struct OutgoingDocument<'a> {
    #[serde(rename = "_uId")]
    id: &'a str,
    #[serde(rename = "_type")]
    doc_type: String,
    data: Box<RawValue>,
    meta: Map<String, JsonValue>,
}

#[derive(Deserialize)]
struct IncomingDocument {
    #[serde(rename = "_uId", default)]
    id: String,
    #[serde(rename = "_type", default)]
    doc_type: String,
    #[serde(default)]
    data: Option<Box<RawValue>>,
    #[serde(default)]
    meta: Map<String, JsonValue>,
}

fn payload_to_raw(payload: &Payload) -> Result<Box<RawValue>> {
    match payload {
        Payload::Empty => Ok(serde_json::value::to_raw_value(&JsonValue::Null)?),
        Payload::Json(v) => Ok(serde_json::value::to_raw_value(v)?),
        Payload::Raw(bytes) => {
            let text = String::from_utf8(bytes.clone())
                .map_err(|e| Error::Serialization(format!("payload is not UTF-8: {}", e)))?;
            Ok(RawValue::from_string(text)?)
        }
    }
}

/// Encode a document into its persisted form
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let outgoing = OutgoingDocument {
        id: doc.id(),
        doc_type: doc.doc_type(),
        data: payload_to_raw(doc.data())?,
        meta: doc.meta().to_persisted(),
    };
    Ok(serde_json::to_vec(&outgoing)?)
}

/// Decode persisted bytes into an existing document
///
/// Identity, type and metadata are replaced by the stored values; an
/// explicit key on `doc` is kept. When `doc` already holds a JSON payload
/// (a typed destination) the stored data is decoded into JSON; otherwise it
/// is kept as raw bytes.
pub fn decode_into(bytes: &[u8], doc: &mut Document) -> Result<()> {
    let incoming: IncomingDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::Malformed(e.to_string()))?;

    doc.set_id(incoming.id);
    doc.set_type(incoming.doc_type);
    doc.set_metadata(Metadata::from_persisted(incoming.meta));

    let raw = incoming.data.map(|d| d.get().to_string());
    let payload = match (doc.data(), raw) {
        (_, None) => Payload::Empty,
        (Payload::Json(_), Some(text)) => Payload::Json(serde_json::from_str(&text)?),
        (_, Some(text)) => Payload::Raw(text.into_bytes()),
    };
    doc.set_payload(payload);
    Ok(())
}

/// Decode persisted bytes into a fresh document
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let mut doc = Document::default();
    decode_into(bytes, &mut doc)?;
    Ok(doc)
}
