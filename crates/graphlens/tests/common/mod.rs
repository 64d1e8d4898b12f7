//! Message builders shared by the integration tests
#![allow(dead_code)]

use serde_json::{json, Value};

pub const DONE: &str = r#"{"type":"done"}"#;

pub fn label_for(id: i64) -> &'static str {
    match id % 3 {
        0 => "Pattern",
        1 => "Target",
        _ => "Compound",
    }
}

/// A node record in the driver's `{low, high}` identity form
pub fn node(id: i64) -> Value {
    json!({
        "identity": {"low": id, "high": 0},
        "labels": [label_for(id)],
        "properties": {"uuid": format!("uuid-{}", id)}
    })
}

/// A one-hop path record
pub fn segment(start: i64, end: i64) -> Value {
    json!({"segments": [{
        "start": node(start),
        "relationship": {"type": "REGULATES", "properties": {"weight": start + end}},
        "end": node(end)
    }]})
}

/// A relationship record whose endpoints are known only by identity
pub fn relationship(start: i64, end: i64) -> Value {
    json!({
        "identity": {"low": 1000 + start * 10 + end, "high": 0},
        "start": {"low": start, "high": 0},
        "end": {"low": end, "high": 0},
        "type": "BINDS",
        "properties": {}
    })
}

pub fn message(kind: &str, fields: Vec<Value>) -> String {
    json!({"type": kind, "data": {"_fields": fields}}).to_string()
}
