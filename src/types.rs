use bson::Bson;
use std::collections::HashMap;

pub type CollectionName = String;
pub type DocumentId = String;

/// Dot-path field name to new value, used for partial updates.
pub type FieldValues = HashMap<String, Bson>;

/// Field holding the soft-delete flag of every entity.
pub const ACTIVE_FIELD_NAME: &str = "active";

/// One dot-path assignment applied by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: String,
    pub value: Bson,
}

impl FieldUpdate {
    pub fn new(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { path: path.into(), value: value.into() }
    }
}

/// Turns a field-value map into store updates. Map order is irrelevant.
#[must_use]
pub fn field_updates(fv: &FieldValues) -> Vec<FieldUpdate> {
    fv.iter().map(|(k, v)| FieldUpdate { path: k.clone(), value: v.clone() }).collect()
}
