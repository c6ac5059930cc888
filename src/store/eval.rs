use crate::errors::StoreError;
use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, SortSpec, Where, WhereOp};

/// True when `doc` satisfies every clause.
#[must_use]
pub fn matches_all(doc: &BsonDocument, filters: &[Where]) -> bool {
    filters.iter().all(|w| eval_where(doc, w))
}

/// Rejects set operators whose value set exceeds the membership limit.
///
/// # Errors
/// `Query` naming the first oversized clause.
pub fn check_filters(filters: &[Where]) -> Result<(), StoreError> {
    for w in filters {
        if let (WhereOp::In | WhereOp::NotIn | WhereOp::ArrayContainsAny, Bson::Array(set)) =
            (w.op, &w.value)
            && set.len() > MAX_IN_SET
        {
            return Err(StoreError::Query(format!(
                "{} {}: {} values exceed the limit of {MAX_IN_SET}",
                w.path,
                w.op,
                set.len()
            )));
        }
    }
    Ok(())
}

#[must_use]
pub fn eval_where(doc: &BsonDocument, w: &Where) -> bool {
    let Some(v) = get_path(doc, &w.path) else {
        // Every operator, negative ones included, requires the field.
        return false;
    };
    match w.op {
        WhereOp::Eq => values_equal(v, &w.value),
        WhereOp::Ne => !values_equal(v, &w.value),
        WhereOp::Lt => comparable(v, &w.value) && compare_bson(v, &w.value) == Ordering::Less,
        WhereOp::Lte => comparable(v, &w.value) && compare_bson(v, &w.value) != Ordering::Greater,
        WhereOp::Gt => comparable(v, &w.value) && compare_bson(v, &w.value) == Ordering::Greater,
        WhereOp::Gte => comparable(v, &w.value) && compare_bson(v, &w.value) != Ordering::Less,
        WhereOp::ArrayContains => match v {
            Bson::Array(items) => items.iter().any(|x| values_equal(x, &w.value)),
            _ => false,
        },
        WhereOp::ArrayContainsAny => match (v, &w.value) {
            (Bson::Array(items), Bson::Array(wanted)) => {
                items.iter().any(|x| is_in_set(x, wanted))
            }
            _ => false,
        },
        WhereOp::In => match &w.value {
            Bson::Array(set) => is_in_set(v, set),
            _ => false,
        },
        WhereOp::NotIn => match &w.value {
            Bson::Array(set) => !is_in_set(v, set),
            _ => false,
        },
    }
}

/// Orders two documents by `sort`; ties are left as `Equal`.
#[must_use]
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if matches!(s.order, Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Total order used for iteration: declared sort fields, then document id.
#[must_use]
pub fn compare_positions(
    a: (&BsonDocument, &str),
    b: (&BsonDocument, &str),
    sort: &[SortSpec],
) -> Ordering {
    compare_docs(a.0, b.0, sort).then_with(|| a.1.cmp(b.1))
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().any(|x| values_equal(x, v))
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

/// Range operators only compare values of the same kind.
fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b)) || type_rank(a) == type_rank(b)
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut segs = 0usize;
    while let Some(part) = parts.next() {
        segs += 1;
        if segs > MAX_PATH_DEPTH {
            return None;
        }
        if parts.peek().is_none() {
            return cur.get(part);
        }
        match cur.get(part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    None
}

#[must_use]
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    #[allow(clippy::cast_precision_loss)]
    fn as_f64_num(x: &T) -> f64 {
        match x {
            T::Int32(i) => f64::from(*i),
            T::Int64(i) => *i as f64,
            T::Double(f) => *f,
            T::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (T::String(x), T::String(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::DateTime(x), T::DateTime(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::Null => 0,
        T::Boolean(_) => 1,
        T::Int32(_) => 2,
        T::Int64(_) => 3,
        T::Double(_) => 4,
        T::String(_) => 5,
        T::Array(_) => 6,
        T::Document(_) => 7,
        T::Binary(_) => 8,
        T::ObjectId(_) => 9,
        T::DateTime(_) => 10,
        T::RegularExpression(_) => 11,
        T::Timestamp(_) => 12,
        T::Symbol(_) => 13,
        T::Decimal128(_) => 14,
        T::Undefined => 15,
        T::DbPointer(_) => 16,
        T::JavaScriptCode(_) => 17,
        T::JavaScriptCodeWithScope(_) => 18,
        T::MaxKey => 250,
        T::MinKey => 251,
    }
}
