//! Untyped query helper
//!
//! `RawQuery` is the shortest path from a statement to decoded rows when
//! the caller has no row type at hand:
//!
//! ```ignore
//! let rows = RawQuery::new(&store, "SELECT * FROM `docs`").execute()?;
//! for row in rows {
//!     println!("{}", row.data);
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use docstore_core::{Fault, Query, QueryParams};

use crate::store::DocumentStore;
use crate::Result;

/// One query row decoded as untyped JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// The row
    pub data: JsonValue,
}

/// A statement bound to a store
#[derive(Debug)]
pub struct RawQuery<'a> {
    store: &'a DocumentStore,
    statement: String,
    params: QueryParams,
}

impl<'a> RawQuery<'a> {
    /// Bind `statement` to `store`
    pub fn new(store: &'a DocumentStore, statement: impl Into<String>) -> Self {
        RawQuery {
            store,
            statement: statement.into(),
            params: QueryParams::None,
        }
    }

    /// Bind parameters used by `execute`
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Statement text
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Run with the bound parameters
    pub fn execute(&self) -> Result<Vec<RawRow>> {
        self.run(self.params.clone())
    }

    /// Run with `params` instead of the bound ones
    pub fn execute_with_params(&self, params: QueryParams) -> Result<Vec<RawRow>> {
        self.run(params)
    }

    fn run(&self, params: QueryParams) -> Result<Vec<RawRow>> {
        let mut query = Query::new(self.statement.as_str());
        query.set_params(params);

        self.store
            .drain(&query)?
            .into_iter()
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .map(|data| RawRow { data })
                    .map_err(|e| Fault::internal(format!("cannot decode row of '{}': {}", self.statement, e)))
            })
            .collect()
    }
}
