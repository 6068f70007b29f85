//! Error types for docstore
//!
//! Two families live here:
//!
//! - [`Fault`]: the stable taxonomy attached to documents when an operation
//!   on them fails. Faults are per item and never abort a batch.
//! - [`Error`]: model-level failures (encoding, decoding) raised while
//!   building or reading a document, before or after any store round-trip.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Model-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored bytes are not a valid document
    #[error("malformed document: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Discriminant of a [`Fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A document with this key already exists
    AlreadyExists,
    /// No document with this key
    NotFound,
    /// Value exceeds the store's size limit
    TooBig,
    /// The store rejected the write
    NotStored,
    /// The store is temporarily unable to serve the request
    TemporaryFailure,
    /// The document is locked, or the CAS did not match
    Locked,
    /// The operation timed out
    Timeout,
    /// The input could not be turned into a document
    InvalidArguments,
    /// Anything the taxonomy does not name
    Internal,
    /// The operation is not implemented
    Unimplemented,
}

/// Classified failure attached to a document
///
/// `key` holds the document key for item-level faults and the statement for
/// query faults.
///
/// | Category | Variants |
/// |----------|----------|
/// | Existence | `AlreadyExists`, `NotFound` |
/// | Write rejected | `TooBig`, `NotStored` |
/// | Contention | `TemporaryFailure`, `Locked`, `Timeout` |
/// | Caller | `InvalidArguments`, `Unimplemented` |
/// | System | `Internal` |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// Key already exists
    #[error("document already exists: {key}")]
    AlreadyExists {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Key not found
    #[error("document not found: {key}")]
    NotFound {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Value too large
    #[error("value too big: {key}")]
    TooBig {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Write not stored
    #[error("not stored: {key}")]
    NotStored {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Temporary failure
    #[error("temporary failure: {key}")]
    TemporaryFailure {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Locked or CAS conflict
    #[error("locked or modified concurrently: {key}")]
    Locked {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Timed out
    #[error("timed out: {key}")]
    Timeout {
        /// Document key, or the statement for query faults
        key: String,
    },

    /// Unsupported input
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// What was wrong with the input
        reason: String,
    },

    /// Unclassified failure
    #[error("internal error: {reason}")]
    Internal {
        /// Collaborator message or decoding error
        reason: String,
    },

    /// Not implemented
    #[error("not implemented: {operation}")]
    Unimplemented {
        /// Name of the operation
        operation: String,
    },
}

impl Fault {
    /// Discriminant of this fault
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::AlreadyExists { .. } => FaultKind::AlreadyExists,
            Fault::NotFound { .. } => FaultKind::NotFound,
            Fault::TooBig { .. } => FaultKind::TooBig,
            Fault::NotStored { .. } => FaultKind::NotStored,
            Fault::TemporaryFailure { .. } => FaultKind::TemporaryFailure,
            Fault::Locked { .. } => FaultKind::Locked,
            Fault::Timeout { .. } => FaultKind::Timeout,
            Fault::InvalidArguments { .. } => FaultKind::InvalidArguments,
            Fault::Internal { .. } => FaultKind::Internal,
            Fault::Unimplemented { .. } => FaultKind::Unimplemented,
        }
    }

    /// Unsupported input shape
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Fault::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Unclassified failure
    pub fn internal(reason: impl Into<String>) -> Self {
        Fault::Internal {
            reason: reason.into(),
        }
    }

    /// Operation not implemented
    pub fn unimplemented(operation: impl Into<String>) -> Self {
        Fault::Unimplemented {
            operation: operation.into(),
        }
    }
}

impl From<Error> for Fault {
    fn from(e: Error) -> Self {
        Fault::internal(e.to_string())
    }
}
