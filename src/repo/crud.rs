//! Single-document operations.
//!
//! The plain functions address the collection an entity names through
//! [`Entity::table_name`]; the `_in` variants take the collection explicitly.

use crate::context::Context;
use crate::document::{CollectionRef, DocumentRef};
use crate::entity::{Entity, Record, from_document};
use crate::errors::{Op, RepoError, StoreError};
use crate::repo::query::{base_query, fetch};
use crate::store::DocumentStore;
use crate::types::{ACTIVE_FIELD_NAME, DocumentId, FieldUpdate, FieldValues, field_updates};
use serde::de::DeserializeOwned;

fn resolve(
    store: &dyn DocumentStore,
    op: Op,
    collection: &str,
) -> Result<CollectionRef, RepoError> {
    store
        .collection(collection)
        .ok_or_else(|| RepoError::NoParentCollection { op, collection: collection.to_string() })
}

/// Reference for `entity`, allocating and assigning a generated id when it has none.
fn doc_for<E: Entity + ?Sized>(
    store: &dyn DocumentStore,
    col: &CollectionRef,
    entity: &mut E,
) -> DocumentRef {
    if entity.id().is_empty() {
        let doc = store.new_doc(col);
        entity.set_id(doc.id.clone());
        doc
    } else {
        col.doc(entity.id())
    }
}

fn not_found_or_store(op: Op, id: &str, err: StoreError) -> RepoError {
    match err {
        StoreError::NotFound(_) => RepoError::NotFound { op, id: id.to_string() },
        other => RepoError::store(op, other),
    }
}

/// Stores a new document for `entity` and returns its id. The entity is marked active;
/// an empty id is replaced with a generated one.
///
/// # Errors
/// `Store(AlreadyExists)` if the id is taken.
pub fn create<E: Record + ?Sized>(
    store: &dyn DocumentStore,
    ctx: &Context,
    entity: &mut E,
) -> Result<DocumentId, RepoError> {
    let collection = entity.table_name().to_string();
    create_in(store, ctx, &collection, entity)
}

/// # Errors
/// See [`create`].
pub fn create_in<E: Record + ?Sized>(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    entity: &mut E,
) -> Result<DocumentId, RepoError> {
    const OP: Op = "repo.create";
    let col = resolve(store, OP, collection)?;
    let doc = doc_for(store, &col, entity);
    entity.set_active(true);
    let data = entity.to_document().map_err(|e| RepoError::store(OP, e))?;
    store.create(ctx, &doc, data).map_err(|e| RepoError::store(OP, e))?;
    log::debug!("created {doc}");
    Ok(doc.id)
}

/// Creates or merges `entity` into its document and returns the id.
///
/// # Errors
/// Store failures.
pub fn set<E: Record + ?Sized>(
    store: &dyn DocumentStore,
    ctx: &Context,
    entity: &mut E,
) -> Result<DocumentId, RepoError> {
    let collection = entity.table_name().to_string();
    set_in(store, ctx, &collection, entity)
}

/// # Errors
/// See [`set`].
pub fn set_in<E: Record + ?Sized>(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    entity: &mut E,
) -> Result<DocumentId, RepoError> {
    const OP: Op = "repo.set";
    let col = resolve(store, OP, collection)?;
    let doc = doc_for(store, &col, entity);
    let data = entity.to_document().map_err(|e| RepoError::store(OP, e))?;
    store.set(ctx, &doc, data, true).map_err(|e| RepoError::store(OP, e))?;
    Ok(doc.id)
}

/// Loads document `id` of the collection `dest` names into `dest`.
///
/// # Errors
/// `NotFound` if there is no such document.
pub fn get_one<E: Entity + DeserializeOwned>(
    store: &dyn DocumentStore,
    ctx: &Context,
    id: &str,
    dest: &mut E,
) -> Result<(), RepoError> {
    let collection = dest.table_name().to_string();
    get_one_in(store, ctx, &collection, id, dest)
}

/// # Errors
/// See [`get_one`].
pub fn get_one_in<E: Entity + DeserializeOwned>(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    id: &str,
    dest: &mut E,
) -> Result<(), RepoError> {
    const OP: Op = "repo.get_one";
    let col = resolve(store, OP, collection)?;
    let shot = store.get(ctx, &col.doc(id)).map_err(|e| RepoError::store(OP, e))?;
    let Some(data) = shot.into_data() else {
        return Err(RepoError::NotFound { op: OP, id: id.to_string() });
    };
    *dest = from_document(id, data).map_err(|e| RepoError::store(OP, e))?;
    Ok(())
}

/// Every entity of the collection `E` is stored in, in natural order.
///
/// # Errors
/// Store failures while iterating.
pub fn get_all<E: Entity + DeserializeOwned + Default>(
    store: &dyn DocumentStore,
    ctx: &Context,
) -> Result<Vec<E>, RepoError> {
    let collection = E::default().table_name().to_string();
    get_all_in(store, ctx, &collection)
}

/// # Errors
/// See [`get_all`].
pub fn get_all_in<E: Entity + DeserializeOwned>(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
) -> Result<Vec<E>, RepoError> {
    const OP: Op = "repo.get_all";
    let col = resolve(store, OP, collection)?;
    let (items, _) =
        fetch(store, ctx, &base_query(&col, &[], &[])).map_err(|e| RepoError::store(OP, e))?;
    Ok(items)
}

/// Applies dot-path field values to an existing document.
///
/// # Errors
/// `NoParentCollection` if the collection cannot be resolved, `NotFound` if the
/// document does not exist.
pub fn update(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    id: &str,
    fv: &FieldValues,
) -> Result<(), RepoError> {
    apply_updates(store, ctx, "repo.update", collection, id, &field_updates(fv))
}

fn apply_updates(
    store: &dyn DocumentStore,
    ctx: &Context,
    op: Op,
    collection: &str,
    id: &str,
    updates: &[FieldUpdate],
) -> Result<(), RepoError> {
    let col = resolve(store, op, collection)?;
    let doc = col.doc(id);
    let shot = store.get(ctx, &doc).map_err(|e| RepoError::store(op, e))?;
    if !shot.exists() {
        return Err(RepoError::NotFound { op, id: id.to_string() });
    }
    store.update(ctx, &doc, updates).map_err(|e| not_found_or_store(op, id, e))?;
    log::debug!("{op} {doc}: {} fields", updates.len());
    Ok(())
}

/// Removes a document. Removing a missing document succeeds.
///
/// # Errors
/// Store failures.
pub fn delete(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    id: &str,
) -> Result<(), RepoError> {
    const OP: Op = "repo.delete";
    let col = resolve(store, OP, collection)?;
    store.delete(ctx, &col.doc(id)).map_err(|e| RepoError::store(OP, e))
}

/// Marks a document inactive.
///
/// # Errors
/// See [`update`].
pub fn soft_delete(
    store: &dyn DocumentStore,
    ctx: &Context,
    collection: &str,
    id: &str,
) -> Result<(), RepoError> {
    let updates = [FieldUpdate::new(ACTIVE_FIELD_NAME, false)];
    apply_updates(store, ctx, "repo.soft_delete", collection, id, &updates)
}
