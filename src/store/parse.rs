use crate::errors::StoreError;
use bson::Bson;
use serde::{Deserialize, Serialize};

use super::types::{MAX_IN_SET, SortSpec, Where, WhereOp};

// Serde-facing structures for safe JSON parsing of where clauses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereSerde {
    pub field: String,
    pub op: String,
    pub value: Bson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereListSerde {
    One(WhereSerde),
    Many(Vec<WhereSerde>),
}

impl TryFrom<WhereSerde> for Where {
    type Error = StoreError;

    fn try_from(ws: WhereSerde) -> Result<Self, Self::Error> {
        let op: WhereOp = ws.op.parse().map_err(StoreError::Query)?;
        let value = match (op, ws.value) {
            (WhereOp::In | WhereOp::NotIn | WhereOp::ArrayContainsAny, Bson::Array(vals)) => {
                if vals.len() > MAX_IN_SET {
                    return Err(StoreError::Query(format!(
                        "{op} takes at most {MAX_IN_SET} values, got {}",
                        vals.len()
                    )));
                }
                Bson::Array(vals)
            }
            (WhereOp::In | WhereOp::NotIn | WhereOp::ArrayContainsAny, _) => {
                return Err(StoreError::Query(format!("{op} requires an array value")));
            }
            (_, v) => v,
        };
        if ws.field.is_empty() {
            return Err(StoreError::Query("empty field path".into()));
        }
        Ok(Self { path: ws.field, op, value })
    }
}

/// Parses one clause object or an array of them.
///
/// # Errors
/// Returns an error if the JSON is malformed, names an unknown operator, or gives a
/// set operator a non-array value.
pub fn parse_where_json(json: &str) -> Result<Vec<Where>, StoreError> {
    let parsed: WhereListSerde =
        serde_json::from_str(json).map_err(|e| StoreError::Query(e.to_string()))?;
    match parsed {
        WhereListSerde::One(w) => Ok(vec![Where::try_from(w)?]),
        WhereListSerde::Many(ws) => ws.into_iter().map(Where::try_from).collect(),
    }
}

/// Parses `[{"field":"age","order":"Desc"}]`.
///
/// # Errors
/// Returns an error if the JSON does not describe a sort list.
pub fn parse_sort_json(json: &str) -> Result<Vec<SortSpec>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Query(e.to_string()))
}
