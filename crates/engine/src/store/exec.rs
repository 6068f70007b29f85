use tracing::{debug, warn};

use docstore_bucket::{QueryRequest, RowIterator};
use docstore_core::{Fault, Query};

use super::DocumentStore;
use crate::classify::{classify, OpCategory};
use crate::query_result::QueryResult;
use crate::Result;

impl DocumentStore {
    pub(crate) fn execute(&self, query: &Query) -> Result<QueryResult> {
        let rows = self.drain(query)?;
        Ok(QueryResult::new(query.clone(), rows))
    }

    /// Submit `query` and pull every row off the collaborator
    ///
    /// The iterator is closed on every path. A close failure after an
    /// otherwise clean drain is reported; after a failed drain the drain
    /// error wins.
    pub(crate) fn drain(&self, query: &Query) -> Result<Vec<Vec<u8>>> {
        let statement = query.statement();
        let request = QueryRequest::from(query);
        debug!(target: "docstore::query", statement, "Executing query");

        let mut iter = self
            .bucket
            .execute_query(&request)
            .map_err(|e| classify(&e, OpCategory::Read, statement))?;

        let drained = self.pull(iter.as_mut(), statement);
        let closed = iter.close();

        let rows = drained?;
        if let Err(e) = closed {
            warn!(target: "docstore::query", statement, error = %e, "Closing row iterator failed");
            return Err(classify(&e, OpCategory::Read, statement));
        }
        debug!(target: "docstore::query", statement, rows = rows.len(), "Query drained");
        Ok(rows)
    }

    fn pull(&self, iter: &mut dyn RowIterator, statement: &str) -> Result<Vec<Vec<u8>>> {
        let mut rows = Vec::new();
        while let Some(row) = iter
            .next_bytes()
            .map_err(|e| classify(&e, OpCategory::Read, statement))?
        {
            if rows.len() == self.max_query_rows {
                warn!(
                    target: "docstore::query",
                    statement,
                    limit = self.max_query_rows,
                    "Query exceeded the row limit"
                );
                return Err(Fault::TooBig {
                    key: statement.to_string(),
                });
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
