//! Cursor pagination.
//!
//! Each call is stateless: the page's query is rebuilt from the request's filters and
//! order, positioned at the document named by the continuation token (inclusive), and
//! cut at the limit. A one-result probe positioned strictly after the last returned
//! document decides whether another page follows; if it finds one, that document's
//! position becomes the next token.

use crate::config::RepoConfig;
use crate::context::Context;
use crate::document::{CollectionRef, Snapshot};
use crate::entity::Entity;
use crate::errors::{Op, RepoError, StoreError};
use crate::repo::cursor::{encode_token, fingerprint, resolve_token};
use crate::repo::query::{base_query, fetch};
use crate::store::{DocumentStore, Order, Query, SortSpec, Where};
use serde::de::DeserializeOwned;

const OP: Op = "repo.paginate";
// Re-planning the probe after it lands on a deleted document.
const PROBE_ATTEMPTS: usize = 3;

/// One pagination step. Filters and order must be repeated on every request of a
/// sequence; tokens issued for one set are rejected by another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    /// 0 selects the configured default.
    pub limit: usize,
    pub filters: Vec<Where>,
    pub order_by: Vec<SortSpec>,
    /// Empty for the first page.
    pub token: String,
    pub with_total: bool,
}

impl PageRequest {
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self { limit, ..Self::default() }
    }

    /// Request for the page following `page`. Filters and order start out empty.
    #[must_use]
    pub fn after<E>(page: &Page<E>) -> Self {
        Self { limit: page.limit, token: page.next_token.clone(), ..Self::default() }
    }

    /// Keeps this request's filters and order, resuming where `page` stopped.
    #[must_use]
    pub fn continue_from<E>(mut self, page: &Page<E>) -> Self {
        self.limit = page.limit;
        self.token.clone_from(&page.next_token);
        self
    }

    #[must_use]
    pub fn filter(mut self, clause: Where) -> Self {
        self.filters.push(clause);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by.push(SortSpec { field: field.into(), order });
        self
    }

    #[must_use]
    pub const fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }
}

/// Result of one pagination step. An empty `next_token` ends the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub next_token: String,
    pub limit: usize,
    /// Matching documents across all pages, when requested.
    pub total: Option<usize>,
}

impl<E> Page<E> {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Pages through the collection `E` is stored in, with default limits.
///
/// # Errors
/// See [`paginate_in`].
pub fn paginate<E>(
    store: &dyn DocumentStore,
    ctx: &Context,
    req: &PageRequest,
) -> Result<Page<E>, RepoError>
where
    E: Entity + DeserializeOwned + Default,
{
    let collection = E::default().table_name().to_string();
    paginate_in(store, ctx, &RepoConfig::default(), &collection, req)
}

/// Returns one page of `collection`.
///
/// # Errors
/// `NoParentCollection` if the collection cannot be resolved, `Decode` for a foreign,
/// corrupt or stale token, and `Store` if the page query or the probe fails. No partial
/// page is returned on error.
pub fn paginate_in<E>(
    store: &dyn DocumentStore,
    ctx: &Context,
    cfg: &RepoConfig,
    collection: &str,
    req: &PageRequest,
) -> Result<Page<E>, RepoError>
where
    E: Entity + DeserializeOwned,
{
    let col = store
        .collection(collection)
        .ok_or_else(|| RepoError::NoParentCollection { op: OP, collection: collection.into() })?;
    let limit = cfg.page_limit(req.limit);
    let fp = fingerprint(&req.filters, &req.order_by);
    let base = base_query(&col, &req.filters, &req.order_by);

    let anchor = if req.token.is_empty() {
        None
    } else {
        Some(resolve_token(OP, store, ctx, &col, &req.token, &fp)?)
    };
    let mut query = base.clone();
    if let Some(shot) = &anchor {
        query = query.start_at(shot.clone());
    }
    let (items, high_water) =
        fetch::<E>(store, ctx, &query.limit(limit)).map_err(|e| RepoError::store(OP, e))?;

    // A page emptied by concurrent deletes probes from its own start instead.
    let next = probe_next(store, ctx, &base, high_water.or(anchor))
        .map_err(|e| RepoError::store(OP, e))?;
    let next_token = match next {
        Some(shot) => encode_token(OP, &col.name, &fp, shot.id())?,
        None => String::new(),
    };
    let total = if req.with_total {
        Some(store.count(ctx, &base).map_err(|e| RepoError::store(OP, e))?)
    } else {
        None
    };
    log_page(&col, items.len(), limit, &next_token);
    Ok(Page { items, next_token, limit, total })
}

/// First existing document strictly after `mark`, or from the start without one.
fn probe_next(
    store: &dyn DocumentStore,
    ctx: &Context,
    base: &Query,
    mark: Option<Snapshot>,
) -> Result<Option<Snapshot>, StoreError> {
    let mut probe = base.clone().limit(1);
    if let Some(mark) = mark {
        probe = probe.start_after(mark);
    }
    for _ in 0..PROBE_ATTEMPTS {
        match store.documents(ctx, &probe)?.next().transpose()? {
            None => return Ok(None),
            Some(shot) if shot.exists() => return Ok(Some(shot)),
            Some(shot) => log::warn!("probe hit {}: deleted while iterating", shot.reference),
        }
    }
    Err(StoreError::InvalidCursor(format!(
        "no stable next position in {} after {PROBE_ATTEMPTS} attempts",
        base.collection
    )))
}

fn log_page(col: &CollectionRef, n: usize, limit: usize, next: &str) {
    log::debug!("page {}: {n}/{limit} items, last={}", col.name, next.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::BaseEntity;
    use crate::document::DocumentRef;
    use crate::store::{BulkWriter, DocumentIter, MemoryStore, StartPosition};
    use crate::types::FieldUpdate;
    use bson::doc;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Serialize, Deserialize, Debug, Default)]
    struct Row {
        #[serde(flatten)]
        base: BaseEntity,
        n: i32,
    }
    crate::impl_entity!(Row, "rows");

    fn seeded(n: i32) -> MemoryStore {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let col = store.collection("rows").unwrap();
        for i in 0..n {
            store.create(&ctx, &col.doc(format!("r{i:02}")), doc! {"n": i, "active": true}).unwrap();
        }
        store
    }

    enum Interference {
        /// Deletes these rows right after the first token-positioned page is planned.
        DeleteAfterPlanning(Vec<&'static str>),
        /// Every one-result query comes back as a deleted document.
        LookaheadAlwaysDeleted,
    }

    struct InterferingStore {
        inner: MemoryStore,
        mode: Interference,
        fired: AtomicBool,
        lookaheads: AtomicUsize,
    }

    impl InterferingStore {
        fn new(inner: MemoryStore, mode: Interference) -> Self {
            Self { inner, mode, fired: AtomicBool::new(false), lookaheads: AtomicUsize::new(0) }
        }
    }

    impl DocumentStore for InterferingStore {
        fn collection(&self, name: &str) -> Option<CollectionRef> {
            self.inner.collection(name)
        }
        fn new_doc(&self, c: &CollectionRef) -> DocumentRef {
            self.inner.new_doc(c)
        }
        fn create(
            &self,
            ctx: &Context,
            doc: &DocumentRef,
            data: bson::Document,
        ) -> Result<(), StoreError> {
            self.inner.create(ctx, doc, data)
        }
        fn set(
            &self,
            ctx: &Context,
            doc: &DocumentRef,
            data: bson::Document,
            merge: bool,
        ) -> Result<(), StoreError> {
            self.inner.set(ctx, doc, data, merge)
        }
        fn get(&self, ctx: &Context, doc: &DocumentRef) -> Result<Snapshot, StoreError> {
            self.inner.get(ctx, doc)
        }
        fn update(
            &self,
            ctx: &Context,
            doc: &DocumentRef,
            u: &[FieldUpdate],
        ) -> Result<(), StoreError> {
            self.inner.update(ctx, doc, u)
        }
        fn delete(&self, ctx: &Context, doc: &DocumentRef) -> Result<(), StoreError> {
            self.inner.delete(ctx, doc)
        }
        fn documents<'a>(
            &'a self,
            ctx: &'a Context,
            query: &Query,
        ) -> Result<DocumentIter<'a>, StoreError> {
            let col = CollectionRef::new(query.collection.clone());
            match &self.mode {
                Interference::DeleteAfterPlanning(victims) => {
                    let iter = self.inner.documents(ctx, query)?;
                    let positioned = matches!(query.start, Some(StartPosition::StartAt(_)));
                    if positioned && !self.fired.swap(true, Ordering::SeqCst) {
                        for id in victims {
                            self.inner.delete(ctx, &col.doc(*id))?;
                        }
                    }
                    Ok(iter)
                }
                Interference::LookaheadAlwaysDeleted if query.limit == Some(1) => {
                    self.lookaheads.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(std::iter::once(Ok(Snapshot::missing(col.doc("ghost"))))))
                }
                Interference::LookaheadAlwaysDeleted => self.inner.documents(ctx, query),
            }
        }
        fn count(&self, ctx: &Context, query: &Query) -> Result<usize, StoreError> {
            self.inner.count(ctx, query)
        }
        fn bulk_writer<'a>(&'a self, ctx: &'a Context) -> Box<dyn BulkWriter + 'a> {
            self.inner.bulk_writer(ctx)
        }
    }

    fn ns(page: &Page<Row>) -> Vec<i32> {
        page.items.iter().map(|r| r.n).collect()
    }

    #[test]
    fn page_emptied_by_deletes_keeps_the_sequence_going() {
        let victims = Interference::DeleteAfterPlanning(vec!["r02", "r03"]);
        let store = InterferingStore::new(seeded(6), victims);
        let ctx = Context::background();
        let first: Page<Row> = paginate(&store, &ctx, &PageRequest::first(2)).unwrap();
        assert_eq!(ns(&first), vec![0, 1]);
        let second: Page<Row> = paginate(&store, &ctx, &PageRequest::after(&first)).unwrap();
        assert!(second.is_empty());
        assert!(!second.is_last());
        let third: Page<Row> = paginate(&store, &ctx, &PageRequest::after(&second)).unwrap();
        assert_eq!(ns(&third), vec![4, 5]);
        assert!(third.is_last());
    }

    #[test]
    fn first_page_emptied_by_deletes_looks_ahead_from_the_start() {
        let store = MemoryStore::new();
        let ctx = Context::background();
        let col = store.collection("rows").unwrap();
        store.create(&ctx, &col.doc("r00"), doc! {"n": 0, "active": true}).unwrap();
        let iter = store.documents(&ctx, &Query::new(&col).limit(1)).unwrap();
        store.delete(&ctx, &col.doc("r00")).unwrap();
        store.create(&ctx, &col.doc("r01"), doc! {"n": 1, "active": true}).unwrap();
        let (items, high_water) = crate::repo::query::collect_entities::<Row, _>(iter).unwrap();
        assert!(items.is_empty() && high_water.is_none());

        let base = Query::new(&col);
        let next = probe_next(&store, &ctx, &base, high_water).unwrap().unwrap();
        assert_eq!(next.id(), "r01");
    }

    #[test]
    fn lookahead_gives_up_after_repeated_deleted_hits() {
        let store = InterferingStore::new(seeded(5), Interference::LookaheadAlwaysDeleted);
        let ctx = Context::background();
        let err = paginate::<Row>(&store, &ctx, &PageRequest::first(2)).unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::InvalidCursor(_))));
        assert_eq!(store.lookaheads.load(Ordering::SeqCst), PROBE_ATTEMPTS);
    }

    #[test]
    fn limit_zero_uses_default_and_total_is_optional() {
        let store = seeded(25);
        let ctx = Context::background();
        let page: Page<Row> = paginate(&store, &ctx, &PageRequest::first(0)).unwrap();
        assert_eq!(page.limit, crate::config::DEFAULT_PAGE_LIMIT);
        assert_eq!(page.len(), 20);
        assert!(page.total.is_none());
        assert!(!page.is_last());

        let page: Page<Row> =
            paginate(&store, &ctx, &PageRequest::first(10).with_total()).unwrap();
        assert_eq!(page.total, Some(25));
    }

    #[test]
    fn last_page_exactly_at_limit_has_empty_token() {
        let store = seeded(4);
        let ctx = Context::background();
        let first: Page<Row> = paginate(&store, &ctx, &PageRequest::first(2)).unwrap();
        let second: Page<Row> = paginate(&store, &ctx, &PageRequest::after(&first)).unwrap();
        assert_eq!(second.items.iter().map(|r| r.n).collect::<Vec<_>>(), vec![2, 3]);
        assert!(second.is_last());
    }

    #[test]
    fn token_of_deleted_document_is_stale() {
        let store = seeded(5);
        let ctx = Context::background();
        let first: Page<Row> = paginate(&store, &ctx, &PageRequest::first(2)).unwrap();
        let col = store.collection("rows").unwrap();
        store.delete(&ctx, &col.doc("r02")).unwrap();
        let err = paginate::<Row>(&store, &ctx, &PageRequest::after(&first)).unwrap_err();
        assert!(matches!(err, RepoError::Decode { .. }));
    }

    #[test]
    fn continue_from_keeps_filters() {
        let store = seeded(10);
        let ctx = Context::background();
        let req = PageRequest::first(2).filter(Where::new("n", crate::store::WhereOp::Gte, 6));
        let first: Page<Row> = paginate(&store, &ctx, &req).unwrap();
        let next = req.continue_from(&first);
        assert_eq!(next.filters.len(), 1);
        let second: Page<Row> = paginate(&store, &ctx, &next).unwrap();
        assert_eq!(second.items.iter().map(|r| r.n).collect::<Vec<_>>(), vec![8, 9]);
        assert!(second.is_last());
    }
}
