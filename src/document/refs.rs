use crate::types::{CollectionName, DocumentId};
use std::fmt;

/// A resolved collection handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub name: CollectionName,
}

impl CollectionRef {
    pub fn new(name: impl Into<CollectionName>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn doc(&self, id: impl Into<DocumentId>) -> DocumentRef {
        DocumentRef { collection: self.name.clone(), id: id.into() }
    }
}

/// Address of one document, whether or not it exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: CollectionName,
    pub id: DocumentId,
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
