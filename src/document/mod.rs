mod core;
mod refs;
mod snapshot;
mod types;

pub use self::core::Document;
pub use refs::{CollectionRef, DocumentRef};
pub use snapshot::Snapshot;
pub use types::Metadata;
