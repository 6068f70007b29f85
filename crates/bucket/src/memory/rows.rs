use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::query::RowIterator;

/// Row iterator over an in-memory result set
///
/// When tracked, the iterator counts itself in a shared gauge from creation
/// until `close`, so tests can check that every iterator was closed.
#[derive(Debug, Default)]
pub struct VecRows {
    rows: VecDeque<Vec<u8>>,
    gauge: Option<Arc<AtomicUsize>>,
    closed: bool,
}

impl VecRows {
    /// Untracked iterator over `rows`
    pub fn new(rows: Vec<Vec<u8>>) -> Self {
        VecRows {
            rows: rows.into(),
            gauge: None,
            closed: false,
        }
    }

    /// Iterator over `rows` counted in `gauge` until closed
    pub fn tracked(rows: Vec<Vec<u8>>, gauge: Arc<AtomicUsize>) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        VecRows {
            rows: rows.into(),
            gauge: Some(gauge),
            closed: false,
        }
    }

    /// Rows not yet returned
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowIterator for VecRows {
    fn next_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.rows.clear();
            if let Some(gauge) = &self.gauge {
                gauge.fetch_sub(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}
