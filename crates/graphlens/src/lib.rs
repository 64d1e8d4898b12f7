//! Graphlens - incremental graph exploration over a message-based connection
//!
//! A library that owns the canonical node/link graph of an exploration
//! session, turns asynchronous query responses into structural diffs, and
//! keeps per-expansion history so a collapse undoes exactly what its
//! expansion added.
//!
//! # Quick Start
//!
//! ```rust
//! use graphlens::replay;
//!
//! let messages = r#"
//! {"type":"load","data":{"_fields":[{"segments":[{"start":{"identity":{"low":1,"high":0},"labels":["Target"]},"relationship":{"type":"REGULATES"},"end":{"identity":{"low":2,"high":0},"labels":["Compound"]}}]}]}}
//! {"type":"done"}
//! "#;
//! let graph = replay(messages).unwrap();
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.link_ids(), vec!["12"]);
//! ```
//!
//! # Sessions
//!
//! For interactive use drive a [`GraphSession`](engine::GraphSession)
//! directly:
//!
//! ```rust
//! use graphlens::prelude::*;
//!
//! let mut session = GraphSession::in_memory();
//! session.try_handle_message(
//!     r#"{"type":"load","data":{"_fields":[{"identity":{"low":7,"high":0},"labels":["Target"],"properties":{"uuid":"t-7"}}]}}"#,
//! ).unwrap();
//! session.try_handle_message(r#"{"type":"done"}"#).unwrap();
//!
//! // The expand request is queued on the in-memory connection.
//! let request = session.node_expand("7", ExpandParams::label("Compound")).unwrap();
//! assert_eq!(request.kind, "expand");
//! assert_eq!(session.connection().len(), 1);
//! ```

pub mod core;
pub mod engine;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Diff, DiffPolicy, DuplicateExpand, Graph, GraphError, Link, LinkId, Node, NodeId,
        ResponseKind, SessionConfig,
    };
    pub use crate::engine::{
        CollapseReport, DataConnection, EntityRegistry, ExpandParams, GraphSession, Intent,
        MessageOutcome, NeighborFilter, QueryDispatcher, Request, RequestQueue, Response,
    };
}

/// Replay newline-delimited inbound messages into a fresh session
///
/// Blank lines are skipped. Unlike an interactive session, the first message
/// that fails to apply aborts the replay.
///
/// # Example
/// ```rust
/// use graphlens::replay;
///
/// let graph = replay("{\"type\":\"done\"}").unwrap();
/// assert!(graph.is_empty());
/// ```
pub fn replay(input: &str) -> anyhow::Result<Graph> {
    replay_with_config(input, SessionConfig::default())
}

/// Replay newline-delimited inbound messages with a specific configuration
pub fn replay_with_config(input: &str, config: SessionConfig) -> anyhow::Result<Graph> {
    use anyhow::Context as _;
    use crate::engine::GraphSession;

    let mut session = GraphSession::with_config(engine::RequestQueue::new(), config);
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        session
            .try_handle_message(line)
            .with_context(|| format!("message on line {}", index + 1))?;
    }
    Ok(session.graph().clone())
}
