//! Graph mutator
//!
//! The only code that changes graph membership. Callers deduplicate through
//! the diff engine first; nothing here checks for existing ids.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::{Diff, Graph, GraphError, Link, NodeId};
use crate::engine::registry::EntityRegistry;

/// Baseline link count of a node with no links
pub const LINK_COUNT_BASELINE: usize = 1;

/// Applies diffs to the canonical graph
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphMutator;

impl GraphMutator {
    /// Append the diff's added nodes and links
    pub fn apply_add(graph: &mut Graph, diff: &Diff) {
        for node in &diff.added_nodes {
            graph.insert_node(node.clone());
        }
        for link in &diff.added_links {
            graph.insert_link(link.clone());
        }
        trace!(%diff, "Applied added side");
    }

    /// Invert an applied diff.
    ///
    /// Removes the added links and nodes, then re-appends whatever the diff
    /// had removed.
    pub fn apply_remove(graph: &mut Graph, diff: &Diff) {
        for link in &diff.added_links {
            graph.remove_link(link.id.as_str());
        }
        for node in &diff.added_nodes {
            graph.remove_node(node.id.as_str());
        }
        for node in &diff.removed_nodes {
            graph.insert_node(node.clone());
        }
        for link in &diff.removed_links {
            graph.insert_link(link.clone());
        }
        trace!(%diff, "Applied inverse");
    }

    /// Apply both sides of a diff
    pub fn apply(graph: &mut Graph, diff: &Diff) {
        for link in &diff.removed_links {
            graph.remove_link(link.id.as_str());
        }
        for node in &diff.removed_nodes {
            graph.remove_node(node.id.as_str());
        }
        Self::apply_add(graph, diff);
    }

    /// Remove links with an endpoint missing from the graph
    pub fn prune_dangling_links(graph: &mut Graph) -> Vec<Link> {
        let dangling: Vec<String> = graph
            .links()
            .filter(|link| {
                !graph.contains_node(link.source.as_str())
                    || !graph.contains_node(link.target.as_str())
            })
            .map(|link| link.id.to_string())
            .collect();

        let pruned: Vec<Link> = dangling
            .iter()
            .filter_map(|id| graph.remove_link(id))
            .collect();
        if !pruned.is_empty() {
            debug!(pruned = pruned.len(), "Pruned dangling links");
        }
        pruned
    }

    /// Recompute `link_count = 1 + degree` for every node.
    ///
    /// Endpoints are resolved through the registry; an unknown endpoint fails
    /// with `NotFound` before any count is written.
    pub fn recompute_link_counts(
        graph: &mut Graph,
        registry: &mut EntityRegistry,
    ) -> Result<(), GraphError> {
        let mut degrees: HashMap<NodeId, usize> = HashMap::new();
        for link in graph.links() {
            for endpoint in [&link.source, &link.target] {
                let node = registry.get_by_id(endpoint.as_str())?;
                *degrees.entry(node.id.clone()).or_insert(0) += 1;
            }
        }

        for node in graph.nodes_mut() {
            node.link_count = LINK_COUNT_BASELINE;
        }
        for (id, degree) in &degrees {
            if let Some(node) = graph.node_mut(id.as_str()) {
                node.link_count = LINK_COUNT_BASELINE + degree;
            }
        }

        for node in graph.nodes() {
            if registry.contains_node(node.id.as_str()) {
                registry.record_link_count(node.id.as_str(), node.link_count)?;
            }
        }

        trace!(linked_nodes = degrees.len(), "Link counts recomputed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Node, Properties};

    fn link(source: &str, target: &str) -> Link {
        Link::new(source, target, "R", Properties::new())
    }

    fn registry_with(ids: &[&str]) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for id in ids {
            registry.set_node(Node::new(*id));
        }
        registry
    }

    fn diff(nodes: &[&str], links: &[(&str, &str)]) -> Diff {
        Diff {
            added_nodes: nodes.iter().map(|id| Node::new(*id)).collect(),
            added_links: links.iter().map(|(s, t)| link(s, t)).collect(),
            ..Diff::default()
        }
    }

    #[test]
    fn test_apply_add_then_remove_restores_membership() {
        let mut graph = Graph::new();
        GraphMutator::apply_add(&mut graph, &diff(&["1", "2"], &[("1", "2")]));
        let expansion = diff(&["3"], &[("1", "3")]);
        GraphMutator::apply_add(&mut graph, &expansion);
        assert_eq!(graph.node_ids(), vec!["1", "2", "3"]);

        GraphMutator::apply_remove(&mut graph, &expansion);
        assert_eq!(graph.node_ids(), vec!["1", "2"]);
        assert_eq!(graph.link_ids(), vec!["12"]);
    }

    #[test]
    fn test_apply_remove_restores_removed_side() {
        let mut graph = Graph::new();
        GraphMutator::apply_add(&mut graph, &diff(&["1", "2"], &[("1", "2")]));
        let replace = Diff {
            added_nodes: vec![Node::new("3")],
            removed_nodes: vec![Node::new("2")],
            added_links: vec![],
            removed_links: vec![link("1", "2")],
        };
        GraphMutator::apply(&mut graph, &replace);
        assert_eq!(graph.node_ids(), vec!["1", "3"]);
        assert_eq!(graph.link_count(), 0);

        GraphMutator::apply_remove(&mut graph, &replace);
        assert_eq!(graph.node_ids(), vec!["1", "2"]);
        assert_eq!(graph.link_ids(), vec!["12"]);
    }

    #[test]
    fn test_link_counts_are_one_plus_degree() {
        let mut graph = Graph::new();
        GraphMutator::apply_add(
            &mut graph,
            &diff(&["1", "2", "3", "4"], &[("1", "2"), ("1", "3"), ("3", "1")]),
        );
        let mut registry = registry_with(&["1", "2", "3", "4"]);
        GraphMutator::recompute_link_counts(&mut graph, &mut registry).unwrap();

        assert_eq!(graph.node("1").unwrap().link_count, 4);
        assert_eq!(graph.node("2").unwrap().link_count, 2);
        assert_eq!(graph.node("3").unwrap().link_count, 3);
        assert_eq!(graph.node("4").unwrap().link_count, 1);
        assert_eq!(registry.get_by_id("1").unwrap().link_count, 4);
    }

    #[test]
    fn test_unknown_endpoint_aborts_without_writing() {
        let mut graph = Graph::new();
        GraphMutator::apply_add(&mut graph, &diff(&["1", "2"], &[("1", "2")]));
        let mut registry = registry_with(&["1"]);
        let err = GraphMutator::recompute_link_counts(&mut graph, &mut registry).unwrap_err();
        assert!(matches!(err, GraphError::NotFound { ref id } if id == "2"));
        assert_eq!(graph.node("1").unwrap().link_count, 0);
    }

    #[test]
    fn test_prune_dangling_links() {
        let mut graph = Graph::new();
        GraphMutator::apply_add(&mut graph, &diff(&["1", "2"], &[("1", "2"), ("2", "9")]));
        let pruned = GraphMutator::prune_dangling_links(&mut graph);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id.as_str(), "29");
        assert_eq!(graph.link_ids(), vec!["12"]);
    }
}
