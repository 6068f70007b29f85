//! Operation inputs and their normalization into documents
//!
//! Every store operation accepts the same closed set of input shapes:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Key` | the physical storage key |
//! | `Row` | an existing document; key, id, type, payload and metadata are carried over |
//! | `Display` | a value rendered with `Display`, used as the key |
//! | `Other` | anything else; rejected with `InvalidArguments` |
//!
//! `CreateOne` is the one exception: it treats any non-`Row` input as a
//! payload to store under a generated id.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

use docstore_core::{type_tag_of, Document, Fault, Payload};

/// An operation input
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Physical storage key
    Key(String),
    /// A document
    Row(Document),
    /// Key rendered from a `Display` value
    Display(String),
    /// Any other value
    Other {
        /// Type tag of the value
        type_tag: String,
        /// The value as JSON, when it could be serialized
        payload: Option<JsonValue>,
    },
}

impl Input {
    /// Key input
    pub fn key(key: impl Into<String>) -> Self {
        Input::Key(key.into())
    }

    /// Key input rendered from a `Display` value
    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Input::Display(value.to_string())
    }

    /// Input for an arbitrary serializable value
    pub fn other<T: Serialize + ?Sized>(value: &T) -> Self {
        Input::Other {
            type_tag: type_tag_of::<T>(),
            payload: serde_json::to_value(value).ok(),
        }
    }

    /// Input of a type the store cannot use
    pub fn unsupported<T: ?Sized>() -> Self {
        Input::Other {
            type_tag: type_tag_of::<T>(),
            payload: None,
        }
    }

    /// Short description used in logs and fault messages
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Key(_) => "key",
            Input::Row(_) => "row",
            Input::Display(_) => "display",
            Input::Other { .. } => "other",
        }
    }
}

impl From<&str> for Input {
    fn from(key: &str) -> Self {
        Input::Key(key.to_string())
    }
}

impl From<String> for Input {
    fn from(key: String) -> Self {
        Input::Key(key)
    }
}

impl From<Document> for Input {
    fn from(row: Document) -> Self {
        Input::Row(row)
    }
}

fn unsupported(type_tag: &str) -> Fault {
    Fault::invalid_arguments(format!(
        "unsupported input type '{}', expecting a key, a displayable value or a row",
        type_tag
    ))
}

fn keyed(key: String) -> Document {
    let mut doc = Document::default();
    doc.set_key(key);
    doc
}

/// Copy of a row with its metadata merged into a fresh document
///
/// The row's fault, if any, is not carried over.
fn from_row(row: &Document) -> Document {
    let mut doc = Document::new(row.id());
    if let Some(key) = row.explicit_key() {
        doc.set_key(key);
    }
    doc.set_type(row.doc_type());
    doc.set_inferred_type(row.inferred_type().map(str::to_string));
    doc.set_payload(row.data().clone());
    doc.meta_mut().merge_from(row.meta());
    doc
}

/// Turn an input into the document an operation works on
///
/// Unsupported inputs and inputs resolving to an empty key come back
/// faulted with `InvalidArguments`; they must never reach the collaborator.
pub fn normalize(input: Input) -> Document {
    let doc = match input {
        Input::Key(key) | Input::Display(key) => keyed(key),
        Input::Row(row) => from_row(&row),
        Input::Other { type_tag, .. } => return Document::faulted(unsupported(&type_tag)),
    };
    if doc.key().is_empty() {
        return Document::faulted(Fault::invalid_arguments("document key must not be empty"));
    }
    doc
}

/// Turn a `CreateOne` input into the document to insert
///
/// Rows normalize as usual. Anything else becomes the payload of a new
/// document with a random v4 id and the payload's type as its type tag.
pub fn normalize_for_create(input: Input) -> Document {
    let (type_tag, payload) = match input {
        Input::Row(_) => return normalize(input),
        Input::Key(value) | Input::Display(value) => {
            (type_tag_of::<String>(), JsonValue::String(value))
        }
        Input::Other {
            type_tag,
            payload: Some(payload),
        } => (type_tag, payload),
        Input::Other {
            type_tag,
            payload: None,
        } => return Document::faulted(unsupported(&type_tag)),
    };
    let mut doc = Document::new(uuid::Uuid::new_v4().to_string());
    doc.set_payload(Payload::Json(payload));
    doc.set_inferred_type(Some(type_tag));
    doc
}
