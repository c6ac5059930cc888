use crate::context::Context;
use crate::document::{DocumentRef, Snapshot};
use crate::errors::StoreError;
use crate::types::DocumentId;
use std::sync::Arc;

use super::collection::Collection;

/// Lazily fetches planned ids. Stops after the first error.
pub struct MemoryCursor<'a> {
    collection: Arc<Collection>,
    ids: std::vec::IntoIter<DocumentId>,
    ctx: &'a Context,
    failed: bool,
}

impl<'a> MemoryCursor<'a> {
    pub(crate) fn new(collection: Arc<Collection>, ids: Vec<DocumentId>, ctx: &'a Context) -> Self {
        Self { collection, ids: ids.into_iter(), ctx, failed: false }
    }

    pub fn advance(&mut self) -> Option<Result<Snapshot, StoreError>> {
        if self.failed {
            return None;
        }
        let id = self.ids.next()?;
        if let Err(e) = self.ctx.check() {
            self.failed = true;
            return Some(Err(e));
        }
        let reference = DocumentRef { collection: self.collection.name.clone(), id };
        Some(Ok(match self.collection.find_document(&reference.id) {
            Some(doc) => Snapshot::found(reference, doc),
            None => Snapshot::missing(reference),
        }))
    }
}

impl Iterator for MemoryCursor<'_> {
    type Item = Result<Snapshot, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
