//! Diff engine
//!
//! Compares the pending lists of a finalized batch against the current graph.
//! The result depends only on the ids and order of its inputs:
//!
//! - added entries follow pending order, first sighting of an id wins;
//! - removed entries follow graph order.

use std::collections::HashSet;
use tracing::{debug, span, Level};

use crate::core::{Diff, Graph, Link, Node};

/// Compute the four-way diff between pending lists and the graph
pub fn compute_diff(pending_nodes: &[Node], pending_links: &[Link], graph: &Graph) -> Diff {
    let diff_span = span!(
        Level::DEBUG,
        "compute_diff",
        pending_nodes = pending_nodes.len(),
        pending_links = pending_links.len()
    );
    let _enter = diff_span.enter();

    let mut pending_node_ids = HashSet::with_capacity(pending_nodes.len());
    let mut added_nodes = Vec::new();
    for node in pending_nodes {
        if pending_node_ids.insert(node.id.as_str()) && !graph.contains_node(node.id.as_str()) {
            added_nodes.push(node.clone());
        }
    }

    let mut pending_link_ids = HashSet::with_capacity(pending_links.len());
    let mut added_links = Vec::new();
    for link in pending_links {
        if pending_link_ids.insert(link.id.as_str()) && !graph.contains_link(link.id.as_str()) {
            added_links.push(link.clone());
        }
    }

    let removed_nodes: Vec<Node> = graph
        .nodes()
        .filter(|node| !pending_node_ids.contains(node.id.as_str()))
        .cloned()
        .collect();

    let removed_links: Vec<Link> = graph
        .links()
        .filter(|link| !pending_link_ids.contains(link.id.as_str()))
        .cloned()
        .collect();

    let diff = Diff {
        added_nodes,
        removed_nodes,
        added_links,
        removed_links,
    };
    debug!(%diff, "Diff computed");
    diff
}
