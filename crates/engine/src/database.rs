//! The `Database` capability set
//!
//! Application code programs against this trait rather than a concrete
//! store. Every item-level operation returns a [`Document`] whose fault
//! state tells the caller how that item went; bulk forms return one
//! document per input plus an aggregate flag. Only query execution and
//! naming report errors through `Result`.

use serde::de::DeserializeOwned;

use docstore_core::{Document, Query};

use crate::input::Input;
use crate::outcome::BulkOutcome;
use crate::query_result::QueryResult;
use crate::Result;

/// Uniform CRUD-plus-query interface over a document store
pub trait Database: Send + Sync {
    /// New empty document with the given id
    fn new_row(&self, id: &str) -> Document;

    /// New query for a statement
    fn new_query(&self, statement: &str) -> Query;

    /// Store name
    fn get_name(&self) -> String;

    /// Rename the store
    fn set_name(&self, name: &str) -> Result<()>;

    /// Insert every input in one batch; existing keys fault `AlreadyExists`
    fn create(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Insert one input; non-row inputs are stored as a payload under a
    /// generated id
    fn create_one(&self, input: Input) -> Document;

    /// Read every input; any LOCK > 0 switches to per-item locking reads
    fn read(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Read one input, leaving the payload as raw bytes
    fn read_one(&self, input: Input) -> Document;

    /// Read one input and decode its payload into `out`
    fn read_one_with_type<T: DeserializeOwned>(&self, input: Input, out: &mut T) -> Document
    where
        Self: Sized;

    /// Replace every input, CAS-conditional where a CAS is present
    fn replace(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Replace one input
    fn replace_one(&self, input: Input) -> Document;

    /// Replace-or-insert every input, ignoring CAS
    fn upsert(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Replace-or-insert one input
    fn upsert_one(&self, input: Input) -> Document;

    /// Not implemented: every item faults `Unimplemented`
    fn update(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Not implemented: always faults `Unimplemented`
    fn update_one(&self, input: Input) -> Document;

    /// Remove every input, CAS-conditional where a CAS is present
    fn destroy(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Remove one input
    fn destroy_one(&self, input: Input) -> Document;

    /// Refresh the expiry of every input to its TTL
    fn touch(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Refresh the expiry of one input
    fn touch_one(&self, input: Input) -> Document;

    /// Release the locks held on every input, given each lock's CAS
    fn unlock(&self, inputs: Vec<Input>) -> BulkOutcome;

    /// Release the lock held on one input
    fn unlock_one(&self, input: Input) -> Document;

    /// Run a query and drain its rows
    fn exec(&self, query: &Query) -> Result<QueryResult>;

    /// Close the store
    fn close(&self);
}
