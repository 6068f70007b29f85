use docstore_core::Document;

/// Result of a bulk operation
///
/// `documents` has one entry per input, in input order. `ok` is false when
/// any of them is faulted; it is a convenience and never a substitute for
/// inspecting each document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    /// One document per input
    pub documents: Vec<Document>,
    /// True when no document is faulted
    pub ok: bool,
}

impl BulkOutcome {
    /// Outcome over `documents`, with `ok` derived from their fault state
    pub fn new(documents: Vec<Document>) -> Self {
        let ok = documents.iter().all(|d| !d.is_faulted());
        BulkOutcome { documents, ok }
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if there are no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Faulted documents with their input positions
    pub fn faulted(&self) -> impl Iterator<Item = (usize, &Document)> {
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_faulted())
    }

    /// Take the documents
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}
