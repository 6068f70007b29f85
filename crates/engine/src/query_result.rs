//! Consumable query results
//!
//! A `QueryResult` owns the rows of one query, already drained from the
//! collaborator, as undecoded byte blobs. It is a one-shot cursor:
//!
//! - `one`, `one_bytes`, `take` and `skip` remove rows from the front.
//! - `for_each`, `map` and `range` work on a snapshot and leave the rows
//!   in place, so they can be repeated.
//! - `close` discards every remaining row.
//!
//! All methods take `&self`; the row buffer sits behind a single mutex that
//! is held only while the buffer is mutated or copied, never while decoding,
//! running a callback or sending on a channel.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::warn;

use docstore_core::{Query, Result};

/// Rows of an executed query
#[derive(Debug)]
pub struct QueryResult {
    query: Query,
    rows: Mutex<VecDeque<Vec<u8>>>,
}

impl QueryResult {
    /// Wrap drained rows
    pub fn new(query: Query, rows: Vec<Vec<u8>>) -> Self {
        QueryResult {
            query,
            rows: Mutex::new(rows.into()),
        }
    }

    /// The query that produced these rows
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Rows not yet consumed
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Check if every row was consumed
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    fn snapshot(&self) -> Vec<Vec<u8>> {
        self.rows.lock().iter().cloned().collect()
    }

    /// Pop the first row and decode it into `out`
    ///
    /// Returns `Ok(false)` without touching `out` when there are no rows.
    /// A row that fails to decode is still consumed.
    pub fn one<T: DeserializeOwned>(&self, out: &mut T) -> Result<bool> {
        let row = match self.one_bytes() {
            Some(row) => row,
            None => return Ok(false),
        };
        *out = serde_json::from_slice(&row)?;
        Ok(true)
    }

    /// Pop the first row undecoded
    pub fn one_bytes(&self) -> Option<Vec<u8>> {
        self.rows.lock().pop_front()
    }

    /// Remove the first `n` rows (fewer if exhausted) into a new result
    pub fn take(&self, n: usize) -> QueryResult {
        let taken: Vec<Vec<u8>> = {
            let mut rows = self.rows.lock();
            let n = n.min(rows.len());
            rows.drain(..n).collect()
        };
        QueryResult::new(self.query.clone(), taken)
    }

    /// Discard the first `n` rows
    pub fn skip(&self, n: usize) -> &Self {
        {
            let mut rows = self.rows.lock();
            let n = n.min(rows.len());
            rows.drain(..n);
        }
        self
    }

    /// Call `f(index, row)` for every remaining row, in order
    pub fn for_each<F: FnMut(usize, &[u8])>(&self, mut f: F) {
        for (i, row) in self.snapshot().iter().enumerate() {
            f(i, row);
        }
    }

    /// Collect `f(index, row)` for every remaining row, in order
    pub fn map<R, F: FnMut(usize, &[u8]) -> R>(&self, mut f: F) -> Vec<R> {
        self.snapshot()
            .iter()
            .enumerate()
            .map(|(i, row)| f(i, row))
            .collect()
    }

    /// Stream the remaining rows through a channel
    ///
    /// A background thread sends a snapshot of the rows and hangs up. The
    /// channel is sized to the snapshot so the producer never blocks, and
    /// the receiver ends after the last row.
    pub fn range(&self) -> Receiver<Vec<u8>> {
        let snapshot = Arc::new(self.snapshot());
        let (tx, rx) = sync_channel(snapshot.len());

        let producer_rows = Arc::clone(&snapshot);
        let producer_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("docstore-range".to_string())
            .spawn(move || {
                for row in producer_rows.iter() {
                    if producer_tx.send(row.clone()).is_err() {
                        break;
                    }
                }
            });

        if let Err(e) = spawned {
            warn!(target: "docstore::query", error = %e, "Range producer thread failed to start, sending inline");
            for row in snapshot.iter() {
                if tx.send(row.clone()).is_err() {
                    break;
                }
            }
        }
        rx
    }

    /// Discard every remaining row; later calls behave as empty
    pub fn close(&self) {
        self.rows.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Row {
        n: u32,
    }

    fn result(n: u32) -> QueryResult {
        let rows = (0..n)
            .map(|i| serde_json::to_vec(&json!({ "n": i })).unwrap())
            .collect();
        QueryResult::new(Query::new("SELECT n"), rows)
    }

    fn numbers(rows: &[Vec<u8>]) -> Vec<u32> {
        rows.iter()
            .map(|r| serde_json::from_slice::<Row>(r).unwrap().n)
            .collect()
    }

    #[test]
    fn test_one_decodes_and_consumes() {
        let qr = result(2);
        let mut row = Row::default();
        assert!(qr.one(&mut row).unwrap());
        assert_eq!(row.n, 0);
        assert!(qr.one(&mut row).unwrap());
        assert_eq!(row.n, 1);

        row.n = 99;
        assert!(!qr.one(&mut row).unwrap());
        assert_eq!(row.n, 99);
    }

    #[test]
    fn test_one_bad_row_is_consumed() {
        let qr = QueryResult::new(Query::new("q"), vec![b"oops".to_vec(), b"{\"n\":1}".to_vec()]);
        let mut row = Row::default();
        assert!(qr.one(&mut row).is_err());
        assert_eq!(qr.len(), 1);
    }

    #[test]
    fn test_take_then_one_bytes() {
        let qr = result(5);
        let taken = qr.take(2);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken.query(), qr.query());

        let next = qr.one_bytes().unwrap();
        assert_eq!(numbers(&[next]), vec![2]);
        assert_eq!(qr.len(), 2);
        assert_eq!(taken.len(), 2);
    }

    #[test]
    fn test_take_more_than_available() {
        let qr = result(2);
        assert_eq!(qr.take(10).len(), 2);
        assert!(qr.is_empty());
        assert!(qr.take(1).is_empty());
    }

    #[test]
    fn test_skip_chains() {
        let qr = result(5);
        let rest = qr.skip(1).skip(2).map(|_, r| r.to_vec());
        assert_eq!(numbers(&rest), vec![3, 4]);
        qr.skip(10);
        assert!(qr.is_empty());
    }

    #[test]
    fn test_for_each_is_repeatable() {
        let qr = result(3);
        let mut first = Vec::new();
        qr.for_each(|i, r| first.push((i, r.to_vec())));
        let mut second = Vec::new();
        qr.for_each(|i, r| second.push((i, r.to_vec())));
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(qr.len(), 3);
    }

    #[test]
    fn test_map_collects_in_order() {
        let qr = result(3);
        let indexes = qr.map(|i, _| i);
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(qr.len(), 3);
    }

    #[test]
    fn test_range_yields_remaining_rows() {
        let qr = result(4);
        qr.skip(1);
        let rows: Vec<Vec<u8>> = qr.range().iter().collect();
        assert_eq!(numbers(&rows), vec![1, 2, 3]);
        assert_eq!(qr.len(), 3);
    }

    #[test]
    fn test_range_empty() {
        let qr = result(0);
        assert_eq!(qr.range().iter().count(), 0);
    }

    #[test]
    fn test_callback_may_reenter() {
        let qr = result(2);
        let mut lens = Vec::new();
        qr.for_each(|_, _| lens.push(qr.len()));
        assert_eq!(lens, vec![2, 2]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let qr = result(3);
        qr.close();
        qr.close();
        assert!(qr.is_empty());
        assert!(qr.one_bytes().is_none());
        assert_eq!(qr.range().iter().count(), 0);
    }

    #[test]
    fn test_concurrent_consumers_partition_rows() {
        let qr = Arc::new(result(100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let qr = Arc::clone(&qr);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(row) = qr.one_bytes() {
                        seen.push(row);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| numbers(&h.join().unwrap()))
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
