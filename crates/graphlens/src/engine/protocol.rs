//! Wire shapes exchanged with the data connection
//!
//! Inbound responses look like
//! `{"type": "expand", "data": {"_fields": [record, ...]}}` where every record
//! is a node, a relationship or a path. Outbound requests look like
//! `{"type": "expand", "message": "<query>", "params": {...}}`.

use serde::{Deserialize, Serialize};

use crate::core::{GraphError, NodeId, Properties, ResponseKind};

/// One inbound message from the data connection
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub data: ResponseData,
}

/// Payload of an inbound message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseData {
    #[serde(rename = "_fields", default)]
    pub fields: Vec<serde_json::Value>,
}

impl Response {
    /// Parse an inbound message from its JSON text.
    ///
    /// A message whose `type` names no graph batch kind, such as the reply to
    /// a `counts` query, is `UnsupportedMessage` rather than malformed.
    pub fn from_json(input: &str) -> Result<Self, GraphError> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| GraphError::malformed_message(format!("{}", e)))?;
        if let Some(name) = value.get("type").and_then(serde_json::Value::as_str) {
            if ResponseKind::from_name(name).is_none() {
                return Err(GraphError::unsupported_message(name));
            }
        }
        serde_json::from_value(value).map_err(|e| GraphError::malformed_message(format!("{}", e)))
    }

    /// Build a response in memory
    pub fn new(kind: ResponseKind, fields: Vec<serde_json::Value>) -> Self {
        Self {
            kind,
            data: ResponseData { fields },
        }
    }

    /// The batch terminator
    pub fn done() -> Self {
        Self::new(ResponseKind::Done, Vec::new())
    }

    pub fn records(&self) -> &[serde_json::Value] {
        &self.data.fields
    }
}

/// Database identity of a node or relationship
///
/// The JavaScript driver reports 64-bit integers as `{low, high}` pairs; plain
/// numbers and strings are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawIdentity {
    Split {
        low: i64,
        #[serde(default)]
        high: i64,
    },
    Number(i64),
    Text(String),
}

impl RawIdentity {
    pub fn to_node_id(&self) -> NodeId {
        match self {
            RawIdentity::Split { low, high } => {
                NodeId::from((*high << 32) | i64::from(*low as u32))
            }
            RawIdentity::Number(value) => NodeId::from(*value),
            RawIdentity::Text(value) => NodeId::from(value.as_str()),
        }
    }
}

/// A node record
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub identity: RawIdentity,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Properties,
}

/// A relationship record whose endpoints are known only by identity
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationship {
    #[serde(default)]
    pub identity: Option<RawIdentity>,
    pub start: RawIdentity,
    pub end: RawIdentity,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Relationship attributes inside a path segment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationshipAttrs {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub properties: Properties,
}

/// One hop of a path record
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub start: RawNode,
    #[serde(default)]
    pub relationship: RawRelationshipAttrs,
    pub end: RawNode,
}

/// A path record
#[derive(Debug, Clone, Deserialize)]
pub struct RawPath {
    pub segments: Vec<RawSegment>,
}

/// A record classified by shape
#[derive(Debug, Clone)]
pub enum RawRecord {
    Path(RawPath),
    Node(RawNode),
    Relationship(RawRelationship),
}

impl RawRecord {
    /// Classify and decode a record.
    ///
    /// Records with `segments` are paths; records with neither `start` nor
    /// `end` are nodes; everything else is a relationship.
    pub fn classify(value: &serde_json::Value) -> Result<Self, GraphError> {
        let object = value
            .as_object()
            .ok_or_else(|| GraphError::malformed_record(format!("expected object, got {}", value)))?;

        let decoded = if object.contains_key("segments") {
            serde_json::from_value(value.clone()).map(RawRecord::Path)
        } else if !object.contains_key("start") && !object.contains_key("end") {
            serde_json::from_value(value.clone()).map(RawRecord::Node)
        } else {
            serde_json::from_value(value.clone()).map(RawRecord::Relationship)
        };

        decoded.map_err(|e| GraphError::malformed_record(format!("{}", e)))
    }
}

/// One outbound request for the data connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub params: Properties,
}

impl Request {
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_with_fields() {
        let response = Response::from_json(
            r#"{"type":"expand","data":{"_fields":[{"identity":{"low":1,"high":0}}]}}"#,
        )
        .unwrap();
        assert_eq!(response.kind, ResponseKind::Expand);
        assert_eq!(response.records().len(), 1);
    }

    #[test]
    fn test_parse_done_without_data() {
        let response = Response::from_json(r#"{"type":"done"}"#).unwrap();
        assert!(response.kind.is_terminal());
        assert!(response.records().is_empty());
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let err = Response::from_json(r#"{"type":"counts","data":{"_fields":[]}}"#).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedMessage { ref kind } if kind == "counts"));
    }

    #[test]
    fn test_non_string_type_is_malformed() {
        let err = Response::from_json(r#"{"type":7}"#).unwrap_err();
        assert!(matches!(err, GraphError::MalformedMessage { .. }));
    }

    #[test]
    fn test_identity_forms() {
        let split: RawIdentity = serde_json::from_value(json!({"low": 42, "high": 0})).unwrap();
        assert_eq!(split.to_node_id().as_str(), "42");
        let wide: RawIdentity = serde_json::from_value(json!({"low": 1, "high": 1})).unwrap();
        assert_eq!(wide.to_node_id().as_str(), "4294967297");
        let number: RawIdentity = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(number.to_node_id().as_str(), "7");
        let text: RawIdentity = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(text.to_node_id().as_str(), "abc");
    }

    #[test]
    fn test_classify_shapes() {
        let node = json!({"identity": {"low": 1, "high": 0}, "labels": ["Target"]});
        assert!(matches!(RawRecord::classify(&node).unwrap(), RawRecord::Node(_)));

        let rel = json!({"start": {"low": 1}, "end": {"low": 2}, "type": "R"});
        assert!(matches!(
            RawRecord::classify(&rel).unwrap(),
            RawRecord::Relationship(_)
        ));

        let path = json!({"segments": [{
            "start": {"identity": {"low": 1}},
            "relationship": {"type": "R"},
            "end": {"identity": {"low": 2}}
        }]});
        assert!(matches!(RawRecord::classify(&path).unwrap(), RawRecord::Path(_)));
    }

    #[test]
    fn test_classify_half_relationship_is_malformed() {
        let half = json!({"identity": {"low": 1}, "start": {"low": 1}});
        let err = RawRecord::classify(&half).unwrap_err();
        assert!(matches!(err, GraphError::MalformedRecord { .. }));
    }

    #[test]
    fn test_classify_non_object_is_malformed() {
        assert!(RawRecord::classify(&json!(12)).is_err());
    }

    #[test]
    fn test_request_wire_shape() {
        let mut params = Properties::new();
        params.insert("qParam".to_string(), json!("abc"));
        let request = Request {
            kind: "expand".to_string(),
            message: "MATCH (n) RETURN n".to_string(),
            params,
        };
        let value: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "expand");
        assert_eq!(value["params"]["qParam"], "abc");
    }
}
