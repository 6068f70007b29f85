//! Query descriptor
//!
//! A `Query` is a statement, its parameters, and metadata carrying the
//! query-only knobs (ADHOC, CONSISTENCY, TIMEOUT). The core never looks
//! inside the statement or the parameters; both are forwarded to the
//! collaborator as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

use crate::coerce::MetaValue;
use crate::metadata::{Metadata, ScanConsistency};

/// Query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParams {
    /// No parameters
    #[default]
    None,
    /// `$1`, `$2`, ... parameters
    Positional(Vec<JsonValue>),
    /// `$name` parameters
    Named(Map<String, JsonValue>),
}

impl QueryParams {
    /// Check if there are no parameters
    pub fn is_none(&self) -> bool {
        matches!(self, QueryParams::None)
    }
}

/// A query request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    statement: String,
    params: QueryParams,
    meta: Metadata,
}

impl Query {
    /// Create a query for a statement
    pub fn new(statement: impl Into<String>) -> Self {
        Query {
            statement: statement.into(),
            ..Default::default()
        }
    }

    /// Statement text
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Replace the statement text
    pub fn set_statement(&mut self, statement: impl Into<String>) {
        self.statement = statement.into();
    }

    /// Parameters
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Replace the parameters
    pub fn set_params(&mut self, params: QueryParams) {
        self.params = params;
    }

    /// Metadata
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Set a metadata value by key
    pub fn set_meta(&mut self, key: &str, value: impl Into<MetaValue>) {
        self.meta.set(key, value);
    }

    /// Get a metadata value by key
    pub fn get_meta(&self, key: &str) -> Option<MetaValue> {
        self.meta.get(key)
    }

    /// Ad-hoc flag, if set
    pub fn adhoc(&self) -> Option<bool> {
        self.meta.adhoc
    }

    /// Scan consistency, if set
    pub fn consistency(&self) -> Option<ScanConsistency> {
        self.meta.consistency
    }

    /// Timeout, if set
    pub fn timeout(&self) -> Option<Duration> {
        self.meta.timeout
    }
}
