//! Integration tests for the public API

mod common;

use common::{message, segment, DONE};
use graphlens::prelude::*;
use graphlens::{replay, replay_with_config};

fn script(lines: &[String]) -> String {
    lines.join("\n")
}

#[test]
fn test_replay_builds_graph() {
    let input = script(&[message("load", vec![segment(1, 2)]), DONE.to_string()]);
    let graph = replay(&input).unwrap();
    assert_eq!(graph.node_ids(), vec!["1", "2"]);
    assert_eq!(graph.link_ids(), vec!["12"]);
}

#[test]
fn test_replay_batches_accumulate_until_done() {
    let input = script(&[
        message("path", vec![segment(1, 2)]),
        message("path", vec![segment(2, 3)]),
        DONE.to_string(),
    ]);
    let graph = replay(&input).unwrap();
    assert_eq!(graph.node_ids(), vec!["1", "2", "3"]);
    assert_eq!(graph.node("2").unwrap().link_count, 3);
}

#[test]
fn test_replay_fails_on_empty_response() {
    let input = script(&[message("expand", vec![]), DONE.to_string()]);
    let err = replay(&input).unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("line 1"));
    assert!(chain.contains("Empty response"));
}

#[test]
fn test_replay_with_config_applies_policy() {
    let input = script(&[
        message("load", vec![segment(1, 2)]),
        DONE.to_string(),
        message("path", vec![segment(3, 4)]),
        DONE.to_string(),
    ]);
    let additive = replay(&input).unwrap();
    assert_eq!(additive.node_count(), 4);

    let config = SessionConfig::new().with_expand_policy(DiffPolicy::Replace);
    let replaced = replay_with_config(&input, config).unwrap();
    assert_eq!(replaced.node_ids(), vec!["3", "4"]);
}

#[test]
fn test_session_queues_expand_request() {
    let mut session = GraphSession::in_memory();
    session
        .try_handle_message(&message("load", vec![segment(1, 2)]))
        .unwrap();
    session.try_handle_message(DONE).unwrap();

    session.node_expand("2", ExpandParams::label("Target")).unwrap();
    let requests = session.connection_mut().drain();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, "expand");
    assert!(requests[0].message.starts_with("MATCH (n:Compound {uuid: $qParam})"));
    assert!(requests[0].message.contains("(b:Target)"));
    assert_eq!(requests[0].params["qParam"], "uuid-2");
}

#[test]
fn test_send_query_is_untracked() {
    let mut session = GraphSession::in_memory();
    let request = session
        .send_query(&Intent::Uuid {
            uuid: "uuid-9".into(),
        })
        .unwrap();
    assert_eq!(request.kind, "uuid");
    assert_eq!(session.connection().len(), 1);
    assert_eq!(session.history().pending_len(), 0);
}

#[test]
fn test_graph_serializes_nodes_and_links() {
    let input = script(&[message("load", vec![segment(1, 2)]), DONE.to_string()]);
    let graph = replay(&input).unwrap();
    let json = serde_json::to_value(&graph).unwrap();

    assert_eq!(json["nodes"][0]["id"], "1");
    assert_eq!(json["nodes"][0]["labels"][0], "Target");
    assert_eq!(json["nodes"][0]["linkCount"], 2);
    assert_eq!(json["nodes"][1]["properties"]["uuid"], "uuid-2");
    assert_eq!(json["links"][0]["source"], "1");
    assert_eq!(json["links"][0]["type"], "REGULATES");
    assert_eq!(json["links"][0]["properties"]["weight"], 3);
}

#[test]
fn test_config_from_file() {
    let dir = std::env::temp_dir().join(format!("graphlens-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.json");
    std::fs::write(&path, r#"{"duplicate_expand": "replace"}"#).unwrap();

    let config = SessionConfig::load(&path).unwrap();
    assert_eq!(config.duplicate_expand, DuplicateExpand::Replace);
    assert_eq!(config.expand_policy, DiffPolicy::Additive);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = SessionConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, GraphError::Io { .. }));
}
