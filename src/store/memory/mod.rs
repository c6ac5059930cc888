//! In-memory document store.

mod bulk;
mod collection;
mod cursor;

pub use bulk::MemoryBulkWriter;
pub use collection::Collection;
pub use cursor::MemoryCursor;

use crate::config::StoreOptions;
use crate::context::Context;
use crate::document::{CollectionRef, Document, DocumentRef, Snapshot};
use crate::errors::StoreError;
use crate::store::{BulkWriter, DocumentIter, DocumentStore, Query, check_filters};
use crate::types::{CollectionName, FieldUpdate};
use bson::Document as BsonDocument;
use bulk::PendingOp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct MemoryStore {
    options: StoreOptions,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("options", &self.options)
            .field("collections", &self.list_collection_names())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        Self { options, collections: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub const fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Returns the named collection, creating it if needed.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                log::info!("create collection {name}");
                Arc::new(Collection::new(name))
            })
            .clone()
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn for_write(&self, name: &str) -> Result<Arc<Collection>, StoreError> {
        if let Some(c) = self.get_collection(name) {
            return Ok(c);
        }
        if self.options.auto_create_collections && valid_name(name) {
            return Ok(self.create_collection(name));
        }
        Err(StoreError::NoSuchCollection(name.to_string()))
    }

    pub(crate) fn apply(&self, ctx: &Context, op: PendingOp) -> Result<(), StoreError> {
        match op {
            PendingOp::Create { doc, data } => self.create(ctx, &doc, data),
            PendingOp::Update { doc, updates } => self.update(ctx, &doc, &updates),
        }
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/')
}

pub(crate) fn check_id(doc: &DocumentRef) -> Result<(), StoreError> {
    if doc.id.is_empty() || doc.id.contains('/') {
        return Err(StoreError::InvalidDocumentId(doc.to_string()));
    }
    Ok(())
}

impl DocumentStore for MemoryStore {
    fn collection(&self, name: &str) -> Option<CollectionRef> {
        if !valid_name(name) {
            return None;
        }
        if self.options.auto_create_collections || self.get_collection(name).is_some() {
            return Some(CollectionRef::new(name));
        }
        None
    }

    fn new_doc(&self, collection: &CollectionRef) -> DocumentRef {
        collection.doc(Uuid::new_v4().simple().to_string())
    }

    fn create(&self, ctx: &Context, doc: &DocumentRef, data: BsonDocument) -> Result<(), StoreError> {
        ctx.check()?;
        check_id(doc)?;
        let col = self.for_write(&doc.collection)?;
        col.insert_document(Document::new(doc.id.clone(), data))?;
        Ok(())
    }

    fn set(
        &self,
        ctx: &Context,
        doc: &DocumentRef,
        data: BsonDocument,
        merge: bool,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        check_id(doc)?;
        self.for_write(&doc.collection)?.upsert_document(&doc.id, data, merge);
        Ok(())
    }

    fn get(&self, ctx: &Context, doc: &DocumentRef) -> Result<Snapshot, StoreError> {
        ctx.check()?;
        check_id(doc)?;
        Ok(match self.get_collection(&doc.collection).and_then(|c| c.find_document(&doc.id)) {
            Some(d) => Snapshot::found(doc.clone(), d),
            None => Snapshot::missing(doc.clone()),
        })
    }

    fn update(
        &self,
        ctx: &Context,
        doc: &DocumentRef,
        updates: &[FieldUpdate],
    ) -> Result<(), StoreError> {
        ctx.check()?;
        check_id(doc)?;
        let col = self
            .get_collection(&doc.collection)
            .ok_or_else(|| StoreError::NotFound(doc.to_string()))?;
        col.update_document(&doc.id, updates)?;
        Ok(())
    }

    fn delete(&self, ctx: &Context, doc: &DocumentRef) -> Result<(), StoreError> {
        ctx.check()?;
        check_id(doc)?;
        if let Some(col) = self.get_collection(&doc.collection) {
            col.delete_document(&doc.id);
        }
        Ok(())
    }

    fn documents<'a>(
        &'a self,
        ctx: &'a Context,
        query: &Query,
    ) -> Result<DocumentIter<'a>, StoreError> {
        ctx.check()?;
        check_filters(&query.filters)?;
        if let Some(start) = &query.start {
            let snap = start.snapshot();
            if snap.reference.collection != query.collection {
                return Err(StoreError::InvalidCursor(format!(
                    "{} is not in collection {}",
                    snap.reference, query.collection
                )));
            }
        }
        let Some(col) = self.get_collection(&query.collection) else {
            if query.start.is_some() {
                return Err(StoreError::InvalidCursor(format!(
                    "collection {} is empty",
                    query.collection
                )));
            }
            return Ok(Box::new(std::iter::empty()));
        };
        let ids = col.plan(query)?;
        log::debug!("query {}: {} planned", query.collection, ids.len());
        Ok(Box::new(MemoryCursor::new(col, ids, ctx)))
    }

    fn count(&self, ctx: &Context, query: &Query) -> Result<usize, StoreError> {
        ctx.check()?;
        check_filters(&query.filters)?;
        let col = self.get_collection(&query.collection);
        Ok(col.map_or(0, |c| c.count_matching(&query.filters)))
    }

    fn bulk_writer<'a>(&'a self, ctx: &'a Context) -> Box<dyn BulkWriter + 'a> {
        Box::new(MemoryBulkWriter::new(self, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn strict_store_only_resolves_known_collections() {
        let store = MemoryStore::with_options(StoreOptions {
            auto_create_collections: false,
            ..StoreOptions::default()
        });
        assert!(store.collection("menus").is_none());
        store.create_collection("menus");
        assert!(store.collection("menus").is_some());
        assert!(store.collection("a/b").is_none());
        assert!(store.collection("").is_none());
    }

    #[test]
    fn deleted_after_planning_yields_missing_snapshot() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let col = store.collection("items").unwrap();
        for id in ["a", "b", "c"] {
            store.create(&ctx, &col.doc(id), doc! {"n": 1}).unwrap();
        }
        let mut it = store.documents(&ctx, &Query::new(&col)).unwrap();
        let first = it.next().unwrap().unwrap();
        assert!(first.exists());
        store.delete(&ctx, &col.doc("b")).unwrap();
        let second = it.next().unwrap().unwrap();
        assert_eq!(second.id(), "b");
        assert!(!second.exists());
        assert!(it.next().unwrap().unwrap().exists());
        assert!(it.next().is_none());
    }

    #[test]
    fn cancelled_context_stops_iteration() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let col = store.collection("items").unwrap();
        store.create(&ctx, &col.doc("a"), doc! {}).unwrap();
        store.create(&ctx, &col.doc("b"), doc! {}).unwrap();
        let mut it = store.documents(&ctx, &Query::new(&col)).unwrap();
        assert!(it.next().unwrap().is_ok());
        ctx.cancel();
        assert!(matches!(it.next(), Some(Err(StoreError::Cancelled))));
        assert!(it.next().is_none());
    }

    #[test]
    fn bulk_writer_reports_per_job_outcomes() {
        let store = MemoryStore::with_options(StoreOptions {
            bulk_max_pending: 2,
            bulk_workers: 3,
            ..StoreOptions::default()
        });
        let ctx = Context::background();
        let col = store.collection("items").unwrap();
        store.create(&ctx, &col.doc("taken"), doc! {}).unwrap();
        let mut w = store.bulk_writer(&ctx);
        let ok = w.create(&col.doc("fresh"), doc! {"v": 1}).unwrap();
        let dup = w.create(&col.doc("taken"), doc! {"v": 2}).unwrap();
        let upd = w.update(&col.doc("missing"), vec![FieldUpdate::new("v", 3)]).unwrap();
        assert!(matches!(w.create(&col.doc("a/b"), doc! {}), Err(StoreError::InvalidDocumentId(_))));
        let mut results = w.end();
        assert!(results.take(ok).is_ok());
        assert!(matches!(results.take(dup), Err(StoreError::AlreadyExists(_))));
        assert!(matches!(results.take(upd), Err(StoreError::NotFound(_))));
        assert!(matches!(w.create(&col.doc("late"), doc! {}), Err(StoreError::BulkWriterClosed)));
        assert!(w.end().is_empty());
    }

    #[test]
    fn start_position_from_other_collection_is_rejected() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let a = store.collection("a").unwrap();
        let b = store.collection("b").unwrap();
        store.create(&ctx, &a.doc("x"), doc! {}).unwrap();
        store.create(&ctx, &b.doc("y"), doc! {}).unwrap();
        let snap = store.get(&ctx, &a.doc("x")).unwrap();
        let err = store.documents(&ctx, &Query::new(&b).start_at(snap)).err().unwrap();
        assert!(matches!(err, StoreError::InvalidCursor(_)));
    }
}
