//! Collaborator error classification
//!
//! Maps a collaborator error plus the category of the operation that hit it
//! onto the stable fault taxonomy:
//!
//! | Collaborator condition | Create | Read | Mutate |
//! |------------------------|--------|------|--------|
//! | `KeyExists` | `AlreadyExists` | `Internal` | `Locked` |
//! | `KeyNotFound` | `Internal` | `NotFound` | `NotFound` |
//! | `ValueTooBig` | `TooBig` | `Internal` | `Internal` |
//! | `NotStored` | `NotStored` | `Internal` | `Internal` |
//! | `TemporaryFailure` | `TemporaryFailure` | `Locked` | `Internal` |
//! | `Timeout` | `Timeout` | `Timeout` | `Timeout` |
//! | anything else | `Internal` | `Internal` | `Internal` |
//!
//! Combinations with no dedicated member are reported as `Internal` and
//! keep the collaborator's message.

use docstore_bucket::{BucketError, OpKind};
use docstore_core::Fault;

/// Category of the operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCategory {
    /// Insert-if-absent
    Create,
    /// Plain or locking read, and query execution
    Read,
    /// Replace, upsert, touch, unlock, remove
    Mutate,
}

impl From<OpKind> for OpCategory {
    fn from(kind: OpKind) -> Self {
        match kind {
            OpKind::Insert => OpCategory::Create,
            OpKind::Get | OpKind::GetAndLock { .. } => OpCategory::Read,
            OpKind::Replace
            | OpKind::Upsert
            | OpKind::Remove
            | OpKind::Touch
            | OpKind::Unlock => OpCategory::Mutate,
        }
    }
}

/// Classify a collaborator error
///
/// `key` is the document key, or the statement for query errors.
pub fn classify(err: &BucketError, category: OpCategory, key: &str) -> Fault {
    use OpCategory::*;

    let key_owned = || key.to_string();
    match (err, category) {
        (BucketError::KeyExists, Create) => Fault::AlreadyExists { key: key_owned() },
        (BucketError::KeyExists, Mutate) => Fault::Locked { key: key_owned() },
        (BucketError::KeyNotFound, Read | Mutate) => Fault::NotFound { key: key_owned() },
        (BucketError::ValueTooBig, Create) => Fault::TooBig { key: key_owned() },
        (BucketError::NotStored, Create) => Fault::NotStored { key: key_owned() },
        (BucketError::TemporaryFailure, Create) => Fault::TemporaryFailure { key: key_owned() },
        (BucketError::TemporaryFailure, Read) => Fault::Locked { key: key_owned() },
        (BucketError::Timeout, _) => Fault::Timeout { key: key_owned() },
        (other, _) => Fault::internal(format!("{}: {}", key, other)),
    }
}
