use crate::document::DocumentRef;
use crate::errors::StoreError;
use crate::types::FieldUpdate;
use bson::Document as BsonDocument;
use std::collections::HashMap;

/// Handle of one enqueued bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulkJob(pub usize);

/// Per-job outcomes reported by [`BulkWriter::end`].
#[derive(Debug, Default)]
pub struct BulkResults {
    results: HashMap<BulkJob, Result<(), StoreError>>,
}

impl BulkResults {
    pub fn insert(&mut self, job: BulkJob, result: Result<(), StoreError>) {
        self.results.insert(job, result);
    }

    /// Removes and returns the outcome of `job`.
    ///
    /// # Errors
    /// The job's own failure, or `MissingBulkResult` if the writer recorded nothing for it.
    pub fn take(&mut self, job: BulkJob) -> Result<(), StoreError> {
        self.results.remove(&job).unwrap_or_else(|| Err(StoreError::MissingBulkResult(job.0)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A best-effort batch-write session.
///
/// Requests are accepted up front and dispatched on the writer's own schedule; their
/// outcomes are only known after [`end`](BulkWriter::end), which flushes and closes the
/// session. Requests are independent: no ordering holds between them.
pub trait BulkWriter: Send {
    /// # Errors
    /// Enqueue-time rejections: invalid id, closed writer, cancelled context.
    fn create(&mut self, doc: &DocumentRef, data: BsonDocument) -> Result<BulkJob, StoreError>;

    /// # Errors
    /// Enqueue-time rejections: invalid id, closed writer, cancelled context.
    fn update(&mut self, doc: &DocumentRef, updates: Vec<FieldUpdate>)
    -> Result<BulkJob, StoreError>;

    /// Flushes every pending request and closes the writer. Calling it again returns
    /// empty results.
    fn end(&mut self) -> BulkResults;
}
