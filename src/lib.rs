//! Generic repository layer over a document store.
//!
//! Entities implement [`Entity`] (usually through [`impl_entity!`]) and are stored through
//! any [`DocumentStore`]. [`MemoryStore`] is the bundled in-memory store.

pub mod config;
pub mod context;
pub mod document;
pub mod entity;
pub mod errors;
pub mod logger;
pub mod repo;
pub mod store;
pub mod types;

pub use config::RepoConfig;
pub use context::Context;
pub use entity::{BaseEntity, Entity, Record};
pub use errors::{CompositeError, ErrorKind, RepoError, StoreError};
pub use repo::{BulkOp, BulkOutcome, Page, PageRequest, Repository, UpdateParams};
pub use store::{DocumentStore, MemoryStore, Order, Where, WhereOp};

/// Initializes the library.
///
/// This function should be called before any other repository operations.
/// It sets up the logger from `log4rs.yaml` when one is present.
///
/// # Errors
/// Returns an error if the logging configuration is invalid.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
