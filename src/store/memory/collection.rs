use crate::document::Document;
use crate::errors::StoreError;
use crate::store::eval::{check_filters, compare_positions, matches_all};
use crate::store::types::{MAX_LIMIT, Query, StartPosition, Where};
use crate::types::{DocumentId, FieldUpdate};
use bson::Document as BsonDocument;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One in-memory collection. Documents are keyed, and naturally ordered, by id.
pub struct Collection {
    pub name: String,
    docs: RwLock<BTreeMap<DocumentId, Document>>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), docs: RwLock::new(BTreeMap::new()) }
    }

    /// # Errors
    /// `AlreadyExists` if the id is taken.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, StoreError> {
        let mut docs = self.docs.write();
        if docs.contains_key(&document.id) {
            return Err(StoreError::AlreadyExists(format!("{}/{}", self.name, document.id)));
        }
        let id = document.id.clone();
        docs.insert(id.clone(), document);
        log::debug!("insert {}/{id}", self.name);
        Ok(id)
    }

    /// Creates or replaces; with `merge` the body is deep-merged into the stored one.
    pub fn upsert_document(&self, id: &str, data: BsonDocument, merge: bool) {
        let mut docs = self.docs.write();
        match docs.get_mut(id) {
            Some(existing) if merge => existing.merge(data),
            Some(existing) => existing.replace(data),
            None => {
                docs.insert(id.to_string(), Document::new(id.to_string(), data));
            }
        }
        log::debug!("upsert {}/{id} merge={merge}", self.name);
    }

    pub fn find_document(&self, id: &str) -> Option<Document> {
        self.docs.read().get(id).cloned()
    }

    /// Applies dot-path updates. Returns whether any stored value changed.
    ///
    /// # Errors
    /// `NotFound` if the document does not exist.
    pub fn update_document(&self, id: &str, updates: &[FieldUpdate]) -> Result<bool, StoreError> {
        let mut docs = self.docs.write();
        let Some(doc) = docs.get_mut(id) else {
            return Err(StoreError::NotFound(format!("{}/{id}", self.name)));
        };
        let mut changed = false;
        for u in updates {
            changed |= doc.set_path(&u.path, u.value.clone());
        }
        log::debug!("update {}/{id} fields={} changed={changed}", self.name, updates.len());
        Ok(changed)
    }

    pub fn delete_document(&self, id: &str) -> bool {
        let removed = self.docs.write().remove(id).is_some();
        if removed {
            log::debug!("delete {}/{id}", self.name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub(crate) fn count_matching(&self, filters: &[Where]) -> usize {
        self.docs.read().values().filter(|d| matches_all(&d.data, filters)).count()
    }

    /// Ids selected by `query`, in iteration order. Documents are fetched later, one by one.
    pub(crate) fn plan(&self, query: &Query) -> Result<Vec<DocumentId>, StoreError> {
        check_filters(&query.filters)?;
        let docs = self.docs.read();
        let mut matched: Vec<&Document> =
            docs.values().filter(|d| matches_all(&d.data, &query.filters)).collect();
        if !query.order_by.is_empty() {
            matched.sort_by(|a, b| {
                compare_positions((&a.data, &a.id), (&b.data, &b.id), &query.order_by)
            });
        }
        if let Some(start) = &query.start {
            let snap = start.snapshot();
            let Some(anchor) = snap.data() else {
                return Err(StoreError::InvalidCursor(format!("{} does not exist", snap.reference)));
            };
            let inclusive = matches!(start, StartPosition::StartAt(_));
            matched.retain(|d| {
                match compare_positions((&d.data, &d.id), (anchor, snap.id()), &query.order_by) {
                    Ordering::Greater => true,
                    Ordering::Equal => inclusive,
                    Ordering::Less => false,
                }
            });
        }
        // No limit means every match.
        let limit = query.limit.map_or(matched.len(), |n| n.min(MAX_LIMIT));
        Ok(matched.into_iter().take(limit).map(|d| d.id.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CollectionRef;
    use crate::store::types::{SortSpec, WhereOp};
    use bson::doc;

    fn seeded() -> Collection {
        let c = Collection::new("people");
        for (id, age) in [("a", 30), ("b", 25), ("c", 30), ("d", 41)] {
            c.insert_document(Document::new(id.into(), doc! {"age": age})).unwrap();
        }
        c
    }

    #[test]
    fn insert_twice_fails() {
        let c = seeded();
        let err = c.insert_document(Document::new("a".into(), doc! {})).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn plan_orders_by_field_then_id() {
        let c = seeded();
        let q = Query::new(&CollectionRef::new("people")).order_by(SortSpec::asc("age"));
        assert_eq!(c.plan(&q).unwrap(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn plan_start_positions() {
        let c = seeded();
        let col = CollectionRef::new("people");
        let anchor = crate::document::Snapshot::found(col.doc("a"), c.find_document("a").unwrap());
        let base = Query::new(&col).order_by(SortSpec::asc("age"));
        assert_eq!(c.plan(&base.clone().start_at(anchor.clone())).unwrap(), vec!["a", "c", "d"]);
        assert_eq!(c.plan(&base.start_after(anchor)).unwrap(), vec!["c", "d"]);
    }

    #[test]
    fn plan_filters_and_limits() {
        let c = seeded();
        let q = Query::new(&CollectionRef::new("people"))
            .filter(Where::new("age", WhereOp::Gte, 30))
            .limit(2);
        assert_eq!(c.plan(&q).unwrap(), vec!["a", "c"]);
        assert_eq!(c.count_matching(&q.filters), 3);
    }

    #[test]
    fn plan_without_limit_returns_every_match() {
        let c = Collection::new("bulk");
        for i in 0..MAX_LIMIT + 5 {
            c.insert_document(Document::new(format!("d{i:05}"), doc! {"i": i as i64})).unwrap();
        }
        let q = Query::new(&CollectionRef::new("bulk"));
        assert_eq!(c.plan(&q).unwrap().len(), MAX_LIMIT + 5);
        assert_eq!(c.plan(&q.limit(MAX_LIMIT + 5)).unwrap().len(), MAX_LIMIT);
    }

    #[test]
    fn plan_rejects_oversized_sets() {
        let c = seeded();
        let set: Vec<bson::Bson> = (0..2000).map(bson::Bson::Int32).collect();
        let q = Query::new(&CollectionRef::new("people")).filter(Where::new("age", WhereOp::In, set));
        assert!(matches!(c.plan(&q), Err(StoreError::Query(_))));
    }

    #[test]
    fn update_missing_document_fails() {
        let c = seeded();
        let err = c.update_document("zz", &[FieldUpdate::new("age", 1)]).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(c.update_document("a", &[FieldUpdate::new("age", 31)]).unwrap());
    }
}
