use std::fmt;
use thiserror::Error;

/// Operation tag attached to repository errors, e.g. `"repo.create"`.
pub type Op = &'static str;

/// Failures reported by the document store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("collection not found: {0}")]
    NoSuchCollection(String),

    #[error("invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("bulk writer closed")]
    BulkWriterClosed,

    #[error("no result recorded for bulk job {0}")]
    MissingBulkResult(usize),

    #[error("context cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Query error: {0}")]
    Query(String),
}

/// Coarse classification of a [`RepoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NoParentCollection,
    Decode,
    Store,
    Composite,
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{op}: document not found: {id}")]
    NotFound { op: Op, id: String },

    #[error("{op}: no parent collection found: {collection}")]
    NoParentCollection { op: Op, collection: String },

    #[error("{op}: cannot decode cursor: {reason}")]
    Decode { op: Op, reason: String },

    #[error("{op}: {source}")]
    Store {
        op: Op,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Composite(#[from] CompositeError),
}

impl RepoError {
    pub(crate) fn store(op: Op, source: impl Into<StoreError>) -> Self {
        Self::Store { op, source: source.into() }
    }

    pub(crate) fn decode(op: Op, reason: impl Into<String>) -> Self {
        Self::Decode { op, reason: reason.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoParentCollection { .. } => ErrorKind::NoParentCollection,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Store { .. } => ErrorKind::Store,
            Self::Composite(_) => ErrorKind::Composite,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The underlying store failure, if this error wraps one.
    #[must_use]
    pub const fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A single failed item of a bulk call.
#[derive(Debug)]
pub struct ItemError {
    pub id: String,
    pub error: RepoError,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.error)
    }
}

/// Every per-item failure of one bulk call, in input order.
/// Renders one `"{id}: {error}"` line per item.
#[derive(Debug, Default)]
pub struct CompositeError {
    pub errors: Vec<ItemError>,
}

impl CompositeError {
    pub fn push(&mut self, id: impl Into<String>, error: RepoError) {
        self.errors.push(ItemError { id: id.into(), error });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemError> {
        self.errors.iter()
    }
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}

impl<'a> IntoIterator for &'a CompositeError {
    type Item = &'a ItemError;
    type IntoIter = std::slice::Iter<'a, ItemError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
