//! Core type definitions for graph sessions
//!
//! This module contains the fundamental types used throughout graphlens:
//! entity ids, nodes, links, the canonical graph, diffs and response kinds.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::OrderedMap;

/// Property bag attached to nodes and links
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Identifier of a node, derived from the database identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a link
///
/// Built by concatenating the source id and the target id, source first and
/// without a separator. `(a, b)` and `(b, a)` therefore get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    /// Build the id of the link running from `source` to `target`
    pub fn between(source: &NodeId, target: &NodeId) -> Self {
        let mut id = String::with_capacity(source.0.len() + target.0.len());
        id.push_str(&source.0);
        id.push_str(&target.0);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LinkId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A node in the graph with its database attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for the node
    pub id: NodeId,
    /// Category tags; the first one is the primary label
    pub labels: Vec<String>,
    /// Domain attributes
    pub properties: Properties,
    /// `1 + degree`, recomputed after every mutation
    pub link_count: usize,
}

impl Node {
    /// Create a bare node with no labels or properties
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            labels: Vec::new(),
            properties: Properties::new(),
            link_count: 0,
        }
    }

    /// Create a node with labels and properties
    pub fn with_attributes(
        id: impl Into<NodeId>,
        labels: Vec<String>,
        properties: Properties,
    ) -> Self {
        Self {
            id: id.into(),
            labels,
            properties,
            link_count: 0,
        }
    }

    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }
}

/// A relationship between two nodes
///
/// Endpoints are always stored as plain node ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    /// Relationship type as reported by the database
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Properties,
}

impl Link {
    /// Create a link whose id follows the source-then-target policy
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        kind: impl Into<String>,
        properties: Properties,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: LinkId::between(&source, &target),
            source,
            target,
            kind: kind.into(),
            properties,
        }
    }

    /// Returns true if either endpoint is `node`
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// Kind of an inbound response message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Result of a target search
    Targets,
    /// Neighbourhood of an expanded node
    Expand,
    /// Shortest-path search result
    Path,
    /// Full graph load
    Load,
    /// End of the current batch
    Done,
}

impl ResponseKind {
    /// Look up a kind by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "targets" => Some(ResponseKind::Targets),
            "expand" => Some(ResponseKind::Expand),
            "path" => Some(ResponseKind::Path),
            "load" => Some(ResponseKind::Load),
            "done" => Some(ResponseKind::Done),
            _ => None,
        }
    }

    /// Returns true for the batch terminator
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseKind::Done)
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseKind::Targets => write!(f, "targets"),
            ResponseKind::Expand => write!(f, "expand"),
            ResponseKind::Path => write!(f, "path"),
            ResponseKind::Load => write!(f, "load"),
            ResponseKind::Done => write!(f, "done"),
        }
    }
}

/// Canonical graph observed by the rendering layer
///
/// Only the graph mutator changes membership; everything else reads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: OrderedMap<NodeId, Node>,
    links: OrderedMap<LinkId, Link>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_link(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    /// Iterate over nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over links in insertion order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.keys().map(NodeId::as_str).collect()
    }

    /// Link ids in insertion order
    pub fn link_ids(&self) -> Vec<&str> {
        self.links.keys().map(LinkId::as_str).collect()
    }

    /// Number of links touching a node
    pub fn degree(&self, id: &NodeId) -> usize {
        self.links.values().filter(|link| link.touches(id)).count()
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub(crate) fn insert_link(&mut self, link: Link) {
        self.links.insert(link.id.clone(), link);
    }

    pub(crate) fn remove_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub(crate) fn remove_link(&mut self, id: &str) -> Option<Link> {
        self.links.remove(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }
}

/// Four-way structural delta between a result set and the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub added_links: Vec<Link>,
    pub removed_links: Vec<Link>,
}

impl Diff {
    /// Create an empty diff skeleton
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_links.is_empty()
            && self.removed_links.is_empty()
    }

    /// The same diff with its removed side dropped
    pub fn additive(mut self) -> Self {
        self.removed_nodes.clear();
        self.removed_links.clear();
        self
    }

    /// Swap the added and removed sides
    pub fn inverse(self) -> Self {
        Self {
            added_nodes: self.removed_nodes,
            removed_nodes: self.added_nodes,
            added_links: self.removed_links,
            removed_links: self.added_links,
        }
    }

    pub fn added_node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.added_nodes.iter().map(|node| &node.id)
    }

    pub fn added_link_ids(&self) -> impl Iterator<Item = &LinkId> {
        self.added_links.iter().map(|link| &link.id)
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{}n -{}n +{}l -{}l",
            self.added_nodes.len(),
            self.removed_nodes.len(),
            self.added_links.len(),
            self.removed_links.len()
        )
    }
}
