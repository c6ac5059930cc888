use crate::document::{Document, DocumentRef};
use bson::Document as BsonDocument;

/// Point-in-time read of one document. A snapshot of a missing document
/// carries only its reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub reference: DocumentRef,
    pub document: Option<Document>,
}

impl Snapshot {
    #[must_use]
    pub const fn missing(reference: DocumentRef) -> Self {
        Self { reference, document: None }
    }

    #[must_use]
    pub fn found(reference: DocumentRef, document: Document) -> Self {
        Self { reference, document: Some(document) }
    }

    #[must_use]
    pub const fn exists(&self) -> bool {
        self.document.is_some()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.reference.id
    }

    #[must_use]
    pub fn data(&self) -> Option<&BsonDocument> {
        self.document.as_ref().map(|d| &d.data)
    }

    #[must_use]
    pub fn into_data(self) -> Option<BsonDocument> {
        self.document.map(|d| d.data)
    }
}
