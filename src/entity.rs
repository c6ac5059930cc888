//! Entity capability traits.
//!
//! Repository code is written against [`Entity`] (identity, collection, active flag) and
//! [`Record`] (marshalling to a stored document), never against concrete record types.

use crate::errors::StoreError;
use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

pub trait Entity {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Collection the entity is stored in.
    fn table_name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

/// Object-safe marshalling, so bulk calls can mix entity types.
pub trait Record: Entity {
    /// # Errors
    /// Returns an error if the entity does not serialize to a BSON document.
    fn to_document(&self) -> Result<BsonDocument, StoreError>;
}

impl<T: Entity + Serialize> Record for T {
    fn to_document(&self) -> Result<BsonDocument, StoreError> {
        Ok(bson::serialize_to_document(self)?)
    }
}

/// Rebuilds an entity from stored data and assigns the document id.
///
/// # Errors
/// Returns an error if the stored data does not deserialize into `E`.
pub fn from_document<E: Entity + DeserializeOwned>(
    id: &str,
    data: BsonDocument,
) -> Result<E, StoreError> {
    let mut item: E = bson::deserialize_from_document(data)?;
    item.set_id(id.to_string());
    Ok(item)
}

/// Common identity fields, meant to be `#[serde(flatten)]`-ed into concrete records.
/// The id is not stored in the document body; it is the document's key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseEntity {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
}

impl BaseEntity {
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), active: true }
    }
}

/// Implements [`Entity`] for a struct with a `base: BaseEntity` field.
///
/// ```ignore
/// impl_entity!(Menu, "menus");
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $table:expr) => {
        impl $crate::entity::Entity for $ty {
            fn id(&self) -> &str {
                &self.base.id
            }
            fn set_id(&mut self, id: String) {
                self.base.id = id;
            }
            fn table_name(&self) -> &str {
                $table
            }
            fn is_active(&self) -> bool {
                self.base.active
            }
            fn set_active(&mut self, active: bool) {
                self.base.active = active;
            }
        }
    };
}
