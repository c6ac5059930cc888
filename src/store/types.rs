use crate::document::{CollectionRef, Snapshot};
use crate::types::CollectionName;
use bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.order {
            Order::Asc => "asc",
            Order::Desc => "desc",
        };
        write!(f, "{} {dir}", self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhereOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl WhereOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::ArrayContains => "array-contains",
            Self::ArrayContainsAny => "array-contains-any",
            Self::In => "in",
            Self::NotIn => "not-in",
        }
    }
}

impl fmt::Display for WhereOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WhereOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" | "$eq" => Self::Eq,
            "!=" | "$ne" => Self::Ne,
            "<" | "$lt" => Self::Lt,
            "<=" | "$lte" => Self::Lte,
            ">" | "$gt" => Self::Gt,
            ">=" | "$gte" => Self::Gte,
            "array-contains" => Self::ArrayContains,
            "array-contains-any" => Self::ArrayContainsAny,
            "in" | "$in" => Self::In,
            "not-in" | "$nin" => Self::NotIn,
            other => return Err(format!("unknown operator {other:?}")),
        })
    }
}

/// One filter clause: `path op value`. Clauses of a query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    pub path: String,
    pub op: WhereOp,
    pub value: Bson,
}

impl Where {
    pub fn new(path: impl Into<String>, op: WhereOp, value: impl Into<Bson>) -> Self {
        Self { path: path.into(), op, value: value.into() }
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(path, WhereOp::Eq, value)
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.op, self.value)
    }
}

/// Where iteration begins, relative to an existing document of the same collection.
#[derive(Debug, Clone, PartialEq)]
pub enum StartPosition {
    /// Inclusive.
    StartAt(Snapshot),
    /// Exclusive.
    StartAfter(Snapshot),
}

impl StartPosition {
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        match self {
            Self::StartAt(s) | Self::StartAfter(s) => s,
        }
    }
}

/// A filtered, ordered, cursor-bounded query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionName,
    pub filters: Vec<Where>,
    pub order_by: Vec<SortSpec>,
    pub start: Option<StartPosition>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new(collection: &CollectionRef) -> Self {
        Self {
            collection: collection.name.clone(),
            filters: Vec::new(),
            order_by: Vec::new(),
            start: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, clause: Where) -> Self {
        self.filters.push(clause);
        self
    }

    #[must_use]
    pub fn order_by(mut self, spec: SortSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    #[must_use]
    pub fn start_at(mut self, snapshot: Snapshot) -> Self {
        self.start = Some(StartPosition::StartAt(snapshot));
        self
    }

    #[must_use]
    pub fn start_after(mut self, snapshot: Snapshot) -> Self {
        self.start = Some(StartPosition::StartAfter(snapshot));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n.min(MAX_LIMIT));
        self
    }
}
