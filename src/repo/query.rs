//! Query construction and result collection shared by listing and pagination.

use crate::context::Context;
use crate::document::{CollectionRef, Snapshot};
use crate::entity::{Entity, from_document};
use crate::errors::StoreError;
use crate::store::{DocumentStore, Query, SortSpec, Where};
use serde::de::DeserializeOwned;

/// The filtered, ordered query every page of one sequence is cut from.
pub(crate) fn base_query(col: &CollectionRef, filters: &[Where], order_by: &[SortSpec]) -> Query {
    let q = filters.iter().cloned().fold(Query::new(col), Query::filter);
    order_by.iter().cloned().fold(q, Query::order_by)
}

/// Runs `query` and decodes every existing document, in store order.
/// Also returns the last decoded snapshot (the high-water mark).
pub(crate) fn fetch<E: Entity + DeserializeOwned>(
    store: &dyn DocumentStore,
    ctx: &Context,
    query: &Query,
) -> Result<(Vec<E>, Option<Snapshot>), StoreError> {
    collect_entities(store.documents(ctx, query)?)
}

pub(crate) fn collect_entities<E, I>(iter: I) -> Result<(Vec<E>, Option<Snapshot>), StoreError>
where
    E: Entity + DeserializeOwned,
    I: IntoIterator<Item = Result<Snapshot, StoreError>>,
{
    let mut items = Vec::new();
    let mut last = None;
    for shot in iter {
        let shot = shot?;
        let Some(data) = shot.data() else {
            log::warn!("skipping {}: deleted while iterating", shot.reference);
            continue;
        };
        items.push(from_document(shot.id(), data.clone())?);
        last = Some(shot);
    }
    Ok((items, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentRef};
    use crate::entity::BaseEntity;
    use crate::store::WhereOp;
    use bson::doc;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, Default)]
    struct Item {
        #[serde(flatten)]
        base: BaseEntity,
        n: i32,
    }
    crate::impl_entity!(Item, "items");

    fn shot(id: &str, data: Option<bson::Document>) -> Snapshot {
        let r = DocumentRef { collection: "items".into(), id: id.into() };
        match data {
            Some(d) => Snapshot::found(r, Document::new(id.into(), d)),
            None => Snapshot::missing(r),
        }
    }

    #[test]
    fn missing_documents_are_skipped() {
        let input = vec![
            Ok(shot("a", Some(doc! {"n": 1, "active": true}))),
            Ok(shot("b", None)),
            Ok(shot("c", Some(doc! {"n": 3, "active": true}))),
        ];
        let (items, last) = collect_entities::<Item, _>(input).unwrap();
        assert_eq!(items.iter().map(|i| i.n).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(items[1].base.id, "c");
        assert_eq!(last.unwrap().id(), "c");
    }

    #[test]
    fn iteration_errors_abort() {
        let input = vec![Ok(shot("a", Some(doc! {"n": 1}))), Err(StoreError::Cancelled)];
        assert!(matches!(collect_entities::<Item, _>(input), Err(StoreError::Cancelled)));
    }

    #[test]
    fn base_query_keeps_clauses_and_order() {
        let col = CollectionRef::new("items");
        let f = [Where::eq("a", 1), Where::new("b", WhereOp::Gt, 2)];
        let q = base_query(&col, &f, &[SortSpec::asc("b")]);
        assert_eq!(q.filters, f.to_vec());
        assert_eq!(q.order_by.len(), 1);
        assert!(q.start.is_none() && q.limit.is_none());
    }
}
