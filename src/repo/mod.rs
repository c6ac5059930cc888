//! The repository layer: single-document operations, bulk writes with partial-failure
//! aggregation, and cursor pagination, all written against [`DocumentStore`] and the
//! [`Entity`] capability traits.
//!
//! [`DocumentStore`]: crate::store::DocumentStore
//! [`Entity`]: crate::entity::Entity

mod bulk;
mod crud;
pub mod cursor;
mod paginate;
mod query;
mod repository;

pub use bulk::{BulkOp, BulkOutcome, UpdateParams, bulk_create, bulk_update, bulk_write};
pub use crud::{
    create, create_in, delete, get_all, get_all_in, get_one, get_one_in, set, set_in,
    soft_delete, update,
};
pub use paginate::{Page, PageRequest, paginate, paginate_in};
pub use repository::Repository;
