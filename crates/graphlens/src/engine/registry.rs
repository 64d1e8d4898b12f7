//! Entity registry
//!
//! Id-keyed storage for every node and link the session has seen. The
//! registry is the single source of truth for whether an entity exists:
//! `set_node` is the deduplication point (last write wins) and `get_by_id`
//! fails loudly for ids that were never registered.

use std::collections::HashMap;
use tracing::trace;

use crate::core::{GraphError, Link, LinkId, Node, NodeId, Properties};
use crate::engine::protocol::{RawIdentity, RawNode};

/// Registry of every node and link materialized during a session
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    nodes: HashMap<NodeId, Node>,
    links: HashMap<LinkId, Link>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node from a raw record without registering it
    pub fn make_node(raw: &RawNode) -> Node {
        Node::with_attributes(
            raw.identity.to_node_id(),
            raw.labels.clone(),
            raw.properties.clone(),
        )
    }

    /// Build a link between two node ids without registering it
    pub fn make_link(
        source: &NodeId,
        target: &NodeId,
        kind: &str,
        properties: &Properties,
    ) -> Link {
        Link::new(source.clone(), target.clone(), kind, properties.clone())
    }

    /// Resolve a relationship endpoint known only by identity.
    ///
    /// Returns the registered record when there is one, otherwise a bare node
    /// with an empty property payload.
    pub fn materialize_endpoint(&self, identity: &RawIdentity) -> Node {
        let id = identity.to_node_id();
        match self.nodes.get(&id) {
            Some(existing) => existing.clone(),
            None => Node::new(id),
        }
    }

    /// Insert or overwrite a node, returning the previous record
    pub fn set_node(&mut self, node: Node) -> Option<Node> {
        trace!(node_id = %node.id, labels = ?node.labels, "Registering node");
        self.nodes.insert(node.id.clone(), node)
    }

    /// Look up a registered node
    pub fn get_by_id(&self, id: &str) -> Result<&Node, GraphError> {
        self.nodes.get(id).ok_or_else(|| GraphError::not_found(id))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert or overwrite a link, returning the previous record
    pub fn set_link(&mut self, link: Link) -> Option<Link> {
        trace!(link_id = %link.id, source = %link.source, target = %link.target, "Registering link");
        self.links.insert(link.id.clone(), link)
    }

    /// Look up a registered link
    pub fn get_link(&self, id: &str) -> Result<&Link, GraphError> {
        self.links.get(id).ok_or_else(|| GraphError::not_found(id))
    }

    /// Store a recomputed link count on the registered record
    pub(crate) fn record_link_count(&mut self, id: &str, count: usize) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::not_found(id))?;
        node.link_count = count;
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }
}
