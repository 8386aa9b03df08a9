//! In-memory evaluation of parsed where trees, mirroring the SQL that
//! `FilterWhere` generates for the JSONB backend.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection, WhereNode};
use crate::types::RecordStatus;

pub fn matches(nodes: &[WhereNode], doc: &Map<String, Value>) -> bool {
    nodes.iter().all(|node| node_matches(node, doc))
}

pub fn is_deleted(doc: &Map<String, Value>) -> bool {
    doc.get(RecordStatus::FIELD)
        .and_then(Value::as_i64)
        .map(|code| code == RecordStatus::Deleted.code())
        .unwrap_or(false)
}

fn node_matches(node: &WhereNode, doc: &Map<String, Value>) -> bool {
    match node {
        WhereNode::Field(info) => field_matches(info, doc),
        WhereNode::And(children) => children.iter().all(|c| node_matches(c, doc)),
        WhereNode::Or(children) => children.iter().any(|c| node_matches(c, doc)),
        WhereNode::Not(children) => !children.iter().all(|c| node_matches(c, doc)),
    }
}

fn field_matches(info: &FilterWhereInfo, doc: &Map<String, Value>) -> bool {
    let actual = doc.get(&info.field);
    let present = actual.filter(|v| !v.is_null());

    match info.operator {
        FilterOp::Eq => match present {
            None => info.data.is_null(),
            Some(v) => json_eq(v, &info.data),
        },
        FilterOp::Ne => match present {
            None => !info.data.is_null(),
            Some(v) => !json_eq(v, &info.data),
        },
        FilterOp::Gt => ordered(actual, &info.data, |o| o == Ordering::Greater),
        FilterOp::Gte => ordered(actual, &info.data, |o| o != Ordering::Less),
        FilterOp::Lt => ordered(actual, &info.data, |o| o == Ordering::Less),
        FilterOp::Lte => ordered(actual, &info.data, |o| o != Ordering::Greater),
        FilterOp::Like | FilterOp::ILike | FilterOp::Regex => {
            match (present.and_then(text_of), info.pattern.as_ref()) {
                (Some(text), Some(re)) => re.is_match(&text),
                _ => false,
            }
        }
        FilterOp::In => {
            let candidates = info.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            present.map(|v| candidates.iter().any(|c| json_eq(v, c))).unwrap_or(false)
        }
        FilterOp::NIn => {
            let candidates = info.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            present.map(|v| !candidates.iter().any(|c| json_eq(v, c))).unwrap_or(true)
        }
        FilterOp::Exists => info.data.as_bool().unwrap_or(true) == actual.is_some(),
    }
}

/// Range comparison with jsonb semantics: values of different types compare
/// by type rank, so `"45" < 30` holds. A missing field is SQL NULL and never
/// matches.
fn ordered(actual: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(v) = actual else { return false };
    let by_type = type_rank(Some(v)).cmp(&type_rank(Some(expected)));
    let ordering = match by_type {
        Ordering::Equal => compare_scalars(v, expected),
        other => Some(other),
    };
    ordering.map(accept).unwrap_or(false)
}

/// Equality with numeric normalization (`1` equals `1.0`, as in jsonb)
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rank of a JSON type in jsonb ordering; missing fields sort like SQL NULL
/// (after everything in ascending order)
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Null) => 0,
        Some(Value::String(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
        None => 6,
    }
}

pub fn compare_documents(a: &Map<String, Value>, b: &Map<String, Value>, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let (left, right) = (a.get(&info.field), b.get(&info.field));
        let ordering = type_rank(left)
            .cmp(&type_rank(right))
            .then_with(|| match (left, right) {
                (Some(l), Some(r)) => compare_scalars(l, r).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        let ordering = match info.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn check(where_data: Value, record: Value) -> bool {
        let nodes = FilterWhere::parse(where_data.as_object().unwrap()).unwrap();
        matches(&nodes, &doc(record))
    }

    #[test]
    fn equality_and_missing_fields() {
        assert!(check(json!({ "clientId": "C1" }), json!({ "clientId": "C1" })));
        assert!(!check(json!({ "clientId": "C1" }), json!({ "clientId": "C2" })));
        assert!(!check(json!({ "clientId": "C1" }), json!({})));
        assert!(check(json!({ "siteId": null }), json!({})));
        assert!(check(json!({ "status": 1 }), json!({ "status": 1.0 })));
        assert!(check(json!({ "status": { "$ne": 2 } }), json!({})));
    }

    #[test]
    fn logical_operators() {
        let where_data = json!({
            "$or": [ { "name": { "$regex": "^acme", "$options": "i" } }, { "status": 0 } ],
            "$not": { "clientId": "C9" }
        });
        assert!(check(where_data.clone(), json!({ "name": "ACME Farms", "clientId": "C1" })));
        assert!(check(where_data.clone(), json!({ "name": "Other", "status": 0, "clientId": "C1" })));
        assert!(!check(where_data.clone(), json!({ "name": "Acme", "clientId": "C9" })));
        assert!(!check(where_data, json!({ "name": "Other", "status": 1 })));
    }

    #[test]
    fn range_and_membership() {
        assert!(check(json!({ "minutes": { "$gte": 30, "$lt": 60 } }), json!({ "minutes": 45 })));
        assert!(!check(json!({ "minutes": { "$gt": 30 } }), json!({ "minutes": "45" })));
        assert!(!check(json!({ "minutes": { "$lt": 30 } }), json!({})));
        assert!(check(json!({ "id": { "$in": ["a", "b"] } }), json!({ "id": "b" })));
        assert!(check(json!({ "id": { "$nin": ["a"] } }), json!({})));
        assert!(check(json!({ "uniqueId": { "$exists": false } }), json!({ "id": "x" })));
    }

    #[test]
    fn mixed_type_ranges_follow_jsonb_type_order() {
        // null < string < number < boolean
        assert!(check(json!({ "minutes": { "$lt": 30 } }), json!({ "minutes": "45" })));
        assert!(check(json!({ "minutes": { "$lt": 30 } }), json!({ "minutes": null })));
        assert!(check(json!({ "name": { "$gt": "zzz" } }), json!({ "name": 1 })));
        assert!(check(json!({ "done": { "$gte": 100 } }), json!({ "done": true })));
        assert!(!check(json!({ "name": { "$lte": "abc" } }), json!({ "name": 5 })));
    }

    #[test]
    fn ordering_matches_jsonb_rules() {
        let order = vec![FilterOrderInfo { field: "n".into(), sort: SortDirection::Asc }];
        let a = doc(json!({ "n": 1 }));
        let b = doc(json!({ "n": 2 }));
        let missing = doc(json!({}));
        assert_eq!(compare_documents(&a, &b, &order), Ordering::Less);
        assert_eq!(compare_documents(&missing, &a, &order), Ordering::Greater);

        let desc = vec![FilterOrderInfo { field: "n".into(), sort: SortDirection::Desc }];
        assert_eq!(compare_documents(&a, &b, &desc), Ordering::Greater);
    }

    #[test]
    fn deleted_detection() {
        assert!(is_deleted(&doc(json!({ "status": 2 }))));
        assert!(!is_deleted(&doc(json!({ "status": 1 }))));
        assert!(!is_deleted(&doc(json!({}))));
    }
}
