//! Property tests for the registry, link ids, diffs and link counts

use graphlens::engine::{compute_diff, EntityRegistry, GraphMutator};
use graphlens::{Graph, Link, LinkId, Node, NodeId, Properties};
use proptest::prelude::*;
use serde_json::json;

fn link(source: u8, target: u8) -> Link {
    Link::new(source.to_string(), target.to_string(), "R", Properties::new())
}

fn nodes(ids: &[u8]) -> Vec<Node> {
    ids.iter().map(|id| Node::new(id.to_string())).collect()
}

/// Node ids plus links between them, self-loops excluded
fn graph_parts() -> impl Strategy<Value = (Vec<u8>, Vec<(u8, u8)>)> {
    prop::collection::vec(0u8..24, 1..12).prop_flat_map(|ids| {
        let pool = ids.clone();
        let links = prop::collection::vec(
            (prop::sample::select(pool.clone()), prop::sample::select(pool)),
            0..16,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(s, t)| s != t)
                .collect::<Vec<(u8, u8)>>()
        });
        (Just(ids), links)
    })
}

fn build_graph(ids: &[u8], pairs: &[(u8, u8)]) -> Graph {
    let mut graph = Graph::new();
    let links: Vec<Link> = pairs.iter().map(|(s, t)| link(*s, *t)).collect();
    let diff = compute_diff(&nodes(ids), &links, &graph);
    GraphMutator::apply_add(&mut graph, &diff);
    graph
}

proptest! {
    #[test]
    fn last_set_node_wins(id in "[0-9]{1,6}", names in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let mut registry = EntityRegistry::new();
        for name in &names {
            let mut properties = Properties::new();
            properties.insert("name".into(), json!(name));
            registry.set_node(Node::with_attributes(id.as_str(), vec!["Target".into()], properties));
        }
        let expected = json!(names.last().unwrap());
        let stored = registry.get_by_id(&id).unwrap();
        prop_assert_eq!(stored.property("name"), Some(&expected));
        prop_assert_eq!(registry.node_count(), 1);
    }

    #[test]
    fn link_ids_are_ordered_and_stable(a in "[0-9]{3}", b in "[0-9]{3}") {
        prop_assume!(a != b);
        let forward = LinkId::between(&NodeId::from(a.as_str()), &NodeId::from(b.as_str()));
        let backward = LinkId::between(&NodeId::from(b.as_str()), &NodeId::from(a.as_str()));
        prop_assert_ne!(&forward, &backward);
        let again = LinkId::between(&NodeId::from(a.as_str()), &NodeId::from(b.as_str()));
        prop_assert_eq!(&forward, &again);
        prop_assert_eq!(forward.as_str(), format!("{}{}", a, b));
    }

    #[test]
    fn applied_diff_inverts_to_original_membership(
        (ids, pairs) in graph_parts(),
        (pending_ids, pending_pairs) in graph_parts(),
    ) {
        let mut graph = build_graph(&ids, &pairs);
        let node_ids: Vec<String> = graph.node_ids().iter().map(|s| s.to_string()).collect();
        let link_ids: Vec<String> = graph.link_ids().iter().map(|s| s.to_string()).collect();

        let pending_links: Vec<Link> = pending_pairs.iter().map(|(s, t)| link(*s, *t)).collect();
        let diff = compute_diff(&nodes(&pending_ids), &pending_links, &graph).additive();
        GraphMutator::apply_add(&mut graph, &diff);
        for id in &pending_ids {
            prop_assert!(graph.contains_node(&id.to_string()));
        }

        GraphMutator::apply_remove(&mut graph, &diff);
        prop_assert_eq!(graph.node_ids(), node_ids.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(graph.link_ids(), link_ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn full_diff_inverts_to_original_membership(
        (ids, pairs) in graph_parts(),
        (pending_ids, pending_pairs) in graph_parts(),
    ) {
        let mut graph = build_graph(&ids, &pairs);
        let mut node_ids: Vec<String> = graph.node_ids().iter().map(|s| s.to_string()).collect();
        let mut link_ids: Vec<String> = graph.link_ids().iter().map(|s| s.to_string()).collect();

        let pending_links: Vec<Link> = pending_pairs.iter().map(|(s, t)| link(*s, *t)).collect();
        let diff = compute_diff(&nodes(&pending_ids), &pending_links, &graph);
        GraphMutator::apply(&mut graph, &diff);
        GraphMutator::apply_remove(&mut graph, &diff);

        // Restored entries are re-appended, so compare as sets.
        let mut restored_nodes: Vec<&str> = graph.node_ids();
        let mut restored_links: Vec<&str> = graph.link_ids();
        node_ids.sort();
        link_ids.sort();
        restored_nodes.sort_unstable();
        restored_links.sort_unstable();
        prop_assert_eq!(restored_nodes, node_ids.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(restored_links, link_ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn link_count_is_one_plus_degree((ids, pairs) in graph_parts()) {
        let mut graph = build_graph(&ids, &pairs);
        let mut registry = EntityRegistry::new();
        for node in graph.nodes() {
            registry.set_node(node.clone());
        }

        GraphMutator::recompute_link_counts(&mut graph, &mut registry).unwrap();
        for node in graph.nodes() {
            prop_assert_eq!(node.link_count, 1 + graph.degree(&node.id));
            prop_assert_eq!(registry.get_by_id(node.id.as_str()).unwrap().link_count, node.link_count);
        }
    }
}
