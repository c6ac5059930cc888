//! Continuation tokens.
//!
//! A token is the hex form of `bincode(CursorToken) ++ crc32`. It names the document a
//! page resumes at together with the collection and a fingerprint of the filter and
//! order set it was issued for, so a token replayed against another query is rejected
//! instead of resuming from the wrong place.

use crate::context::Context;
use crate::document::{CollectionRef, Snapshot};
use crate::errors::{Op, RepoError, StoreError};
use crate::store::{DocumentStore, SortSpec, Where};
use crate::types::DocumentId;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};

const TOKEN_VERSION: u8 = 1;
const CRC_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CursorToken {
    version: u8,
    collection: String,
    fingerprint: String,
    id: DocumentId,
}

fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(input.as_bytes());
    hex::encode(h.finalize())
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut h = Crc32Hasher::new();
    h.update(bytes);
    h.finalize()
}

/// Identity of a filter and order set. Clause order does not matter; order-by order does.
#[must_use]
pub fn fingerprint(filters: &[Where], order_by: &[SortSpec]) -> String {
    let mut clauses: Vec<String> = filters.iter().map(ToString::to_string).collect();
    clauses.sort();
    let order: Vec<String> = order_by.iter().map(ToString::to_string).collect();
    sha256_hex(&format!("where[{}] order[{}]", clauses.join(" && "), order.join(", ")))
}

/// Encodes a resume position at document `id`.
///
/// # Errors
/// Returns a store error if the token cannot be serialized.
pub fn encode_token(
    op: Op,
    collection: &str,
    fingerprint: &str,
    id: &str,
) -> Result<String, RepoError> {
    let token = CursorToken {
        version: TOKEN_VERSION,
        collection: collection.to_string(),
        fingerprint: fingerprint.to_string(),
        id: id.to_string(),
    };
    let mut bytes = encode_to_vec(&token, standard())
        .map_err(|e| RepoError::store(op, StoreError::InvalidCursor(e.to_string())))?;
    let crc = crc32(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    Ok(hex::encode(bytes))
}

/// Decodes `token` and checks it was issued for `collection` and `fingerprint`.
///
/// # Errors
/// `RepoError::Decode` for anything that is not a token of this query.
pub fn decode_token(
    op: Op,
    token: &str,
    collection: &str,
    fingerprint: &str,
) -> Result<DocumentId, RepoError> {
    let bytes = hex::decode(token).map_err(|e| RepoError::decode(op, format!("not hex: {e}")))?;
    if bytes.len() <= CRC_LEN {
        return Err(RepoError::decode(op, "token too short"));
    }
    let (payload, tail) = bytes.split_at(bytes.len() - CRC_LEN);
    let mut crc = [0u8; CRC_LEN];
    crc.copy_from_slice(tail);
    if crc32(payload) != u32::from_le_bytes(crc) {
        return Err(RepoError::decode(op, "checksum mismatch"));
    }
    let (decoded, used): (CursorToken, usize) =
        decode_from_slice(payload, standard()).map_err(|e| RepoError::decode(op, e.to_string()))?;
    if used != payload.len() {
        return Err(RepoError::decode(op, "trailing bytes"));
    }
    if decoded.version != TOKEN_VERSION {
        return Err(RepoError::decode(op, format!("unsupported version {}", decoded.version)));
    }
    if decoded.collection != collection {
        return Err(RepoError::decode(
            op,
            format!("issued for collection {}, not {collection}", decoded.collection),
        ));
    }
    if decoded.fingerprint != fingerprint {
        return Err(RepoError::decode(op, "issued for a different filter or order set"));
    }
    Ok(decoded.id)
}

/// Decodes `token` and fetches the document it resumes at.
///
/// # Errors
/// `RepoError::Decode` for foreign or stale tokens; store failures while fetching.
pub(crate) fn resolve_token(
    op: Op,
    store: &dyn DocumentStore,
    ctx: &Context,
    col: &CollectionRef,
    token: &str,
    fingerprint: &str,
) -> Result<Snapshot, RepoError> {
    let id = decode_token(op, token, &col.name, fingerprint).inspect_err(|e| {
        log::warn!("rejected cursor for {}: {e}", col.name);
    })?;
    let shot = store.get(ctx, &col.doc(id)).map_err(|e| RepoError::store(op, e))?;
    if !shot.exists() {
        log::warn!("rejected cursor for {}: {} no longer exists", col.name, shot.reference);
        return Err(RepoError::decode(op, format!("stale cursor: {} was deleted", shot.reference)));
    }
    Ok(shot)
}
