//! Query requests and row iterators

use std::time::Duration;

use docstore_core::{Query, QueryParams, ScanConsistency};

use crate::error::Result;

/// A statement ready to be submitted to the query service
///
/// Built from a [`Query`]: the optional knobs come from its ADHOC,
/// CONSISTENCY and TIMEOUT metadata and are only forwarded when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Statement text
    pub statement: String,
    /// Parameters, opaque to the store
    pub params: QueryParams,
    /// Ad-hoc (non-prepared) execution
    pub adhoc: Option<bool>,
    /// Requested scan consistency
    pub consistency: Option<ScanConsistency>,
    /// Server-side deadline
    pub timeout: Option<Duration>,
}

impl QueryRequest {
    /// Request for a bare statement
    pub fn new(statement: impl Into<String>) -> Self {
        QueryRequest {
            statement: statement.into(),
            ..Default::default()
        }
    }
}

impl From<&Query> for QueryRequest {
    fn from(query: &Query) -> Self {
        QueryRequest {
            statement: query.statement().to_string(),
            params: query.params().clone(),
            adhoc: query.adhoc(),
            consistency: query.consistency(),
            timeout: query.timeout(),
        }
    }
}

/// Cursor over raw result rows
///
/// The iterator is only valid for the call that produced it and must be
/// closed explicitly.
pub trait RowIterator: Send {
    /// Next row as undecoded bytes, `None` once exhausted
    fn next_bytes(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the iterator
    fn close(&mut self) -> Result<()>;
}
