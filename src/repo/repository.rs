use crate::config::RepoConfig;
use crate::context::Context;
use crate::entity::{Entity, Record};
use crate::errors::RepoError;
use crate::repo::bulk::{self, BulkOutcome, UpdateParams};
use crate::repo::crud;
use crate::repo::paginate::{Page, PageRequest, paginate_in};
use crate::store::DocumentStore;
use crate::types::{CollectionName, DocumentId, FieldValues};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Repository bound to one collection of a shared store.
///
/// Single-document calls and pagination address the bound collection. Bulk calls
/// address whatever collection each item names, like the free functions in
/// [`crate::repo`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    collection: CollectionName,
    config: RepoConfig,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<CollectionName>) -> Self {
        Self::with_config(store, collection, RepoConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<CollectionName>,
        config: RepoConfig,
    ) -> Self {
        Self { store, collection: collection.into(), config }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub const fn config(&self) -> &RepoConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// # Errors
    /// See [`crud::create`].
    pub fn create<E: Record + ?Sized>(
        &self,
        ctx: &Context,
        entity: &mut E,
    ) -> Result<DocumentId, RepoError> {
        crud::create_in(self.store(), ctx, &self.collection, entity)
    }

    /// # Errors
    /// See [`crud::set`].
    pub fn set<E: Record + ?Sized>(
        &self,
        ctx: &Context,
        entity: &mut E,
    ) -> Result<DocumentId, RepoError> {
        crud::set_in(self.store(), ctx, &self.collection, entity)
    }

    /// # Errors
    /// See [`crud::get_one`].
    pub fn get_one<E: Entity + DeserializeOwned>(
        &self,
        ctx: &Context,
        id: &str,
        dest: &mut E,
    ) -> Result<(), RepoError> {
        crud::get_one_in(self.store(), ctx, &self.collection, id, dest)
    }

    /// # Errors
    /// See [`crud::get_all`].
    pub fn get_all<E: Entity + DeserializeOwned>(
        &self,
        ctx: &Context,
    ) -> Result<Vec<E>, RepoError> {
        crud::get_all_in(self.store(), ctx, &self.collection)
    }

    /// # Errors
    /// See [`crud::update`].
    pub fn update(&self, ctx: &Context, id: &str, fv: &FieldValues) -> Result<(), RepoError> {
        crud::update(self.store(), ctx, &self.collection, id, fv)
    }

    /// # Errors
    /// See [`crud::delete`].
    pub fn delete(&self, ctx: &Context, id: &str) -> Result<(), RepoError> {
        crud::delete(self.store(), ctx, &self.collection, id)
    }

    /// # Errors
    /// See [`crud::soft_delete`].
    pub fn soft_delete(&self, ctx: &Context, id: &str) -> Result<(), RepoError> {
        crud::soft_delete(self.store(), ctx, &self.collection, id)
    }

    /// # Errors
    /// See [`bulk::bulk_write`].
    pub fn bulk_create<E: Record>(
        &self,
        ctx: &Context,
        entities: &mut [E],
        ignore_fail: bool,
    ) -> Result<BulkOutcome, RepoError> {
        bulk::bulk_create(self.store(), ctx, entities, ignore_fail)
    }

    /// # Errors
    /// See [`bulk::bulk_write`].
    pub fn bulk_update(
        &self,
        ctx: &Context,
        params: Vec<UpdateParams>,
        ignore_fail: bool,
    ) -> Result<BulkOutcome, RepoError> {
        bulk::bulk_update(self.store(), ctx, params, ignore_fail)
    }

    /// Pages through the bound collection with this repository's limits.
    ///
    /// # Errors
    /// See [`paginate_in`].
    pub fn paginate<E: Entity + DeserializeOwned>(
        &self,
        ctx: &Context,
        req: &PageRequest,
    ) -> Result<Page<E>, RepoError> {
        paginate_in(self.store(), ctx, &self.config, &self.collection, req)
    }
}
