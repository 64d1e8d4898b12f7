//! Response parser
//!
//! Turns the raw records of one inbound message into pending node and link
//! lists. Parsing is all-or-nothing per message: a malformed record rejects
//! the whole message so no partial batch reaches the pending lists.

use std::collections::HashMap;
use tracing::{debug, span, trace, Level};

use crate::core::{GraphError, Link, Node, NodeId, ResponseKind};
use crate::engine::protocol::{RawIdentity, RawRecord};
use crate::engine::registry::EntityRegistry;

/// Nodes and links materialized from one message
///
/// Entries may repeat; the diff engine deduplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl ParsedBatch {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Append another batch, keeping arrival order
    pub fn extend(&mut self, other: ParsedBatch) {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }
}

/// Stateless parser for inbound record lists
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the records of one message.
    ///
    /// The registry is only read: endpoints known only by id resolve to the
    /// registered record when one exists. Registration is left to the caller
    /// once the whole message parsed.
    pub fn parse(
        &self,
        records: &[serde_json::Value],
        kind: ResponseKind,
        registry: &EntityRegistry,
    ) -> Result<ParsedBatch, GraphError> {
        let parse_span = span!(Level::DEBUG, "parse_records", %kind, record_count = records.len());
        let _enter = parse_span.enter();

        if records.is_empty() {
            return Err(GraphError::empty_response(kind));
        }

        let mut batch = ParsedBatch::default();
        // Full node records seen earlier in this message, for endpoint lookup.
        let mut seen: HashMap<NodeId, Node> = HashMap::new();

        for value in records {
            match RawRecord::classify(value)? {
                RawRecord::Path(path) => {
                    trace!(segments = path.segments.len(), "Path record");
                    for segment in &path.segments {
                        let start = EntityRegistry::make_node(&segment.start);
                        let end = EntityRegistry::make_node(&segment.end);
                        let link = EntityRegistry::make_link(
                            &start.id,
                            &end.id,
                            &segment.relationship.kind,
                            &segment.relationship.properties,
                        );
                        seen.insert(start.id.clone(), start.clone());
                        seen.insert(end.id.clone(), end.clone());
                        batch.nodes.push(start);
                        batch.nodes.push(end);
                        batch.links.push(link);
                    }
                }
                RawRecord::Node(raw) => {
                    let node = EntityRegistry::make_node(&raw);
                    trace!(node_id = %node.id, "Node record");
                    seen.insert(node.id.clone(), node.clone());
                    batch.nodes.push(node);
                }
                RawRecord::Relationship(raw) => {
                    let start = Self::endpoint(&raw.start, &seen, registry);
                    let end = Self::endpoint(&raw.end, &seen, registry);
                    let link =
                        EntityRegistry::make_link(&start.id, &end.id, &raw.kind, &raw.properties);
                    trace!(link_id = %link.id, "Relationship record");
                    batch.nodes.push(start);
                    batch.nodes.push(end);
                    batch.links.push(link);
                }
            }
        }

        debug!(
            node_count = batch.nodes.len(),
            link_count = batch.links.len(),
            "Parsed records"
        );
        Ok(batch)
    }

    fn endpoint(
        identity: &RawIdentity,
        seen: &HashMap<NodeId, Node>,
        registry: &EntityRegistry,
    ) -> Node {
        match seen.get(&identity.to_node_id()) {
            Some(node) => node.clone(),
            None => registry.materialize_endpoint(identity),
        }
    }
}
