use crate::document::types::Metadata;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

/// A stored document: key, body and write timestamps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(id: DocumentId, data: BsonDocument) -> Self {
        Self { id, data, metadata: Metadata::new() }
    }

    /// Replaces the whole body.
    pub fn replace(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.metadata.touch();
    }

    /// Deep-merges `patch` into the body: nested documents are merged key by key,
    /// every other value overwrites.
    pub fn merge(&mut self, patch: BsonDocument) {
        merge_into(&mut self.data, patch);
        self.metadata.touch();
    }

    /// Applies a dot-path assignment, creating intermediate documents as needed.
    /// Returns whether the stored value changed.
    pub fn set_path(&mut self, path: &str, value: Bson) -> bool {
        let Some((parent, last)) = traverse_to_parent(&mut self.data, path) else {
            return false;
        };
        let old = parent.insert(last, value.clone());
        let changed = old.as_ref() != Some(&value);
        if changed {
            self.metadata.touch();
        }
        changed
    }
}

fn merge_into(target: &mut BsonDocument, patch: BsonDocument) {
    for (k, v) in patch {
        match (target.get_mut(&k), v) {
            (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, v) => {
                target.insert(k, v);
            }
        }
    }
}

/// The sub-document at `key`, replacing any non-document value there.
fn ensure_subdoc<'a>(root: &'a mut BsonDocument, key: &str) -> Option<&'a mut BsonDocument> {
    let slot = root.entry(key.to_string()).or_insert_with(|| Bson::Document(BsonDocument::new()));
    if !matches!(slot, Bson::Document(_)) {
        *slot = Bson::Document(BsonDocument::new());
    }
    slot.as_document_mut()
}

fn traverse_to_parent<'a>(
    root: &'a mut BsonDocument,
    path: &str,
) -> Option<(&'a mut BsonDocument, String)> {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return Some((cur, seg.to_string()));
        }
        cur = ensure_subdoc(cur, seg)?;
    }
    None
}
