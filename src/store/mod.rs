//! The document store collaborator: the capabilities the repository layer is built on,
//! plus an in-memory implementation.

mod bulk;
mod eval;
pub mod memory;
mod parse;
mod types;

pub use bulk::{BulkJob, BulkResults, BulkWriter};
pub use eval::{
    check_filters, compare_bson, compare_docs, compare_positions, eval_where, matches_all,
};
pub use memory::MemoryStore;
pub use parse::{WhereListSerde, WhereSerde, parse_sort_json, parse_where_json};
pub use types::{MAX_LIMIT, Order, Query, SortSpec, StartPosition, Where, WhereOp};

use crate::context::Context;
use crate::document::{CollectionRef, DocumentRef, Snapshot};
use crate::errors::StoreError;
use crate::types::FieldUpdate;
use bson::Document as BsonDocument;

/// Ordered query results. Items are fetched lazily, so a document deleted after the
/// query was planned comes back as a snapshot that does not exist.
pub type DocumentIter<'a> = Box<dyn Iterator<Item = Result<Snapshot, StoreError>> + 'a>;

/// Collection-scoped document storage.
///
/// Every call takes the caller's [`Context`]; a cancelled or expired context fails the
/// call with `Cancelled` / `DeadlineExceeded`.
pub trait DocumentStore: Send + Sync {
    /// Resolves a named collection, `None` if it cannot be resolved.
    fn collection(&self, name: &str) -> Option<CollectionRef>;

    /// Allocates a reference with a fresh server-generated id.
    fn new_doc(&self, collection: &CollectionRef) -> DocumentRef;

    /// # Errors
    /// `AlreadyExists` if a document is stored at `doc`.
    fn create(&self, ctx: &Context, doc: &DocumentRef, data: BsonDocument) -> Result<(), StoreError>;

    /// Creates or replaces; with `merge` nested maps are merged into the stored body.
    ///
    /// # Errors
    /// Store failures.
    fn set(&self, ctx: &Context, doc: &DocumentRef, data: BsonDocument, merge: bool)
    -> Result<(), StoreError>;

    /// # Errors
    /// Store failures. A missing document is not an error; see [`Snapshot::exists`].
    fn get(&self, ctx: &Context, doc: &DocumentRef) -> Result<Snapshot, StoreError>;

    /// # Errors
    /// `NotFound` if nothing is stored at `doc`.
    fn update(&self, ctx: &Context, doc: &DocumentRef, updates: &[FieldUpdate])
    -> Result<(), StoreError>;

    /// Deleting a missing document succeeds.
    ///
    /// # Errors
    /// Store failures.
    fn delete(&self, ctx: &Context, doc: &DocumentRef) -> Result<(), StoreError>;

    /// Runs `query`, yielding documents in order: `order_by` fields, then id.
    ///
    /// # Errors
    /// `InvalidCursor` if the start position does not name an existing document of the
    /// queried collection.
    fn documents<'a>(&'a self, ctx: &'a Context, query: &Query)
    -> Result<DocumentIter<'a>, StoreError>;

    /// Number of documents matching the filters of `query`, ignoring start and limit.
    ///
    /// # Errors
    /// Store failures.
    fn count(&self, ctx: &Context, query: &Query) -> Result<usize, StoreError>;

    /// Opens a batch-write session. The caller must call [`BulkWriter::end`].
    fn bulk_writer<'a>(&'a self, ctx: &'a Context) -> Box<dyn BulkWriter + 'a>;
}
