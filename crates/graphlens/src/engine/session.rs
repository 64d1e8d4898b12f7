//! Graph session
//!
//! The session owns one `SessionContext` (registry, canonical graph, history
//! and the pending batch) and drives the pipeline:
//!
//! message → parser → pending batch → `done` → diff → mutator → stream
//!
//! User operations (`node_expand`, `node_collapse`, `clear_graph`) go through
//! the same context. Every graph mutation is staged on a copy and committed
//! only once link counts recompute cleanly.
//!
//! Every request the session sends is remembered until its response is
//! finalized, so a `done` with no records is attributed to the request it
//! actually answers.

use std::collections::VecDeque;
use std::mem;
use tracing::{debug, error, info, span, warn, Level};

use crate::core::{
    Diff, DiffPolicy, DuplicateExpand, Graph, GraphError, LinkId, Node, NodeId, ResponseKind,
    SessionConfig,
};
use crate::engine::connection::{DataConnection, RequestQueue};
use crate::engine::diff::compute_diff;
use crate::engine::dispatcher::{Intent, NeighborFilter, QueryDispatcher};
use crate::engine::history::{HistoryEntry, HistoryTracker};
use crate::engine::mutator::GraphMutator;
use crate::engine::parser::{ParsedBatch, ResponseParser};
use crate::engine::protocol::{Request, Response};
use crate::engine::registry::EntityRegistry;
use crate::engine::stream::{GraphStream, SubscriptionId};

/// All mutable state of one session
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    registry: EntityRegistry,
    graph: Graph,
    history: HistoryTracker,
    pending: ParsedBatch,
    batch_kind: Option<ResponseKind>,
    outstanding: VecDeque<OutstandingRequest>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    /// Records buffered since the last `done`
    pub fn pending(&self) -> &ParsedBatch {
        &self.pending
    }

    /// Kind of the batch being buffered, if any message arrived since `done`
    pub fn batch_kind(&self) -> Option<ResponseKind> {
        self.batch_kind
    }

    /// Requests sent and not yet answered, oldest first
    pub fn outstanding(&self) -> impl Iterator<Item = &OutstandingRequest> {
        self.outstanding.iter()
    }

    /// Retire the oldest outstanding request of `kind`
    fn retire_kind(&mut self, kind: &str) -> Option<OutstandingRequest> {
        let position = self.outstanding.iter().position(|request| request.kind == kind)?;
        self.outstanding.remove(position)
    }

    /// Retire the expand request for `node_id` along with older expand
    /// requests, whose responses were lost
    fn retire_expansion(&mut self, node_id: &NodeId) {
        let Some(answered) = self
            .outstanding
            .iter()
            .position(|request| request.is_expand_of(node_id))
        else {
            self.retire_kind(EXPAND);
            return;
        };
        let mut position = 0;
        self.outstanding.retain(|request| {
            let keep = position > answered || request.kind != EXPAND;
            position += 1;
            keep
        });
    }
}

const EXPAND: &str = "expand";

/// A request sent through the data connection and not yet answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingRequest {
    /// Wire kind of the request
    pub kind: String,
    /// Expanded node, for expand requests
    pub node_id: Option<NodeId>,
}

impl OutstandingRequest {
    fn is_expand_of(&self, node_id: &NodeId) -> bool {
        self.kind == EXPAND && self.node_id.as_ref() == Some(node_id)
    }
}

/// Parameters of a user-initiated expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandParams {
    /// Label of the expanded node; defaults to its primary label
    pub origin: Option<String>,
    pub neighbors: NeighborFilter,
}

impl ExpandParams {
    /// Expand towards every neighbour
    pub fn all() -> Self {
        Self {
            origin: None,
            neighbors: NeighborFilter::All,
        }
    }

    /// Expand towards neighbours carrying `label`
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            origin: None,
            neighbors: NeighborFilter::Label(label.into()),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl Default for ExpandParams {
    fn default() -> Self {
        Self::all()
    }
}

/// What a finalized batch did to the graph
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub kind: ResponseKind,
    pub policy: DiffPolicy,
    /// The diff as applied
    pub diff: Diff,
    /// Node whose history entry the batch filled, for expand batches
    pub expanded: Option<NodeId>,
}

/// What a collapse did to the graph
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseReport {
    pub node_id: NodeId,
    /// Inverse actually applied, after retention
    pub applied: Diff,
    /// Nodes left visible because another expansion still references them
    pub retained_nodes: Vec<NodeId>,
    pub retained_links: Vec<LinkId>,
    /// Links dropped because an endpoint left the graph
    pub pruned_links: Vec<LinkId>,
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Records were added to the pending batch
    Buffered { kind: ResponseKind, records: usize },
    /// A `done` finalized a batch and the graph was published
    Applied(BatchReport),
    /// A `done` finalized an empty batch; nothing changed
    Idle,
    /// A reply that carries no graph batch was ignored
    Unsupported { kind: String },
}

/// An interactive exploration session over one data connection
pub struct GraphSession<C: DataConnection = RequestQueue> {
    context: SessionContext,
    config: SessionConfig,
    parser: ResponseParser,
    dispatcher: QueryDispatcher,
    stream: GraphStream,
    connection: C,
}

impl GraphSession<RequestQueue> {
    /// Create a session that queues requests in memory
    pub fn in_memory() -> Self {
        Self::new(RequestQueue::new())
    }
}

impl<C: DataConnection> GraphSession<C> {
    /// Create a session with the default configuration
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, SessionConfig::default())
    }

    pub fn with_config(connection: C, config: SessionConfig) -> Self {
        Self {
            context: SessionContext::new(),
            config,
            parser: ResponseParser::new(),
            dispatcher: QueryDispatcher::new(),
            stream: GraphStream::new(),
            connection,
        }
    }

    /// Handle one inbound message, containing any failure.
    ///
    /// Failures are logged and the offending message is dropped; `None` is
    /// returned in that case.
    pub fn handle_message(&mut self, input: &str) -> Option<MessageOutcome> {
        match self.try_handle_message(input) {
            Ok(outcome) => Some(outcome),
            Err(err @ GraphError::EmptyResponse { .. }) => {
                warn!(error = %err, "Dropped empty response");
                None
            }
            Err(err) => {
                error!(error = %err, "Failed to handle message");
                None
            }
        }
    }

    /// Handle one inbound message given as JSON text
    pub fn try_handle_message(&mut self, input: &str) -> Result<MessageOutcome, GraphError> {
        match Response::from_json(input) {
            Ok(response) => self.handle_response(response),
            Err(GraphError::UnsupportedMessage { kind }) => {
                let answered = self.context.retire_kind(&kind).is_some();
                debug!(%kind, answered, "Ignored unsupported message");
                Ok(MessageOutcome::Unsupported { kind })
            }
            Err(err) => Err(err),
        }
    }

    /// Handle one decoded inbound message
    pub fn handle_response(&mut self, response: Response) -> Result<MessageOutcome, GraphError> {
        let message_span = span!(
            Level::INFO,
            "handle_message",
            kind = %response.kind,
            records = response.records().len()
        );
        let _enter = message_span.enter();

        if response.kind.is_terminal() {
            return Ok(match self.finalize()? {
                Some(report) => MessageOutcome::Applied(report),
                None => MessageOutcome::Idle,
            });
        }

        let kind = response.kind;
        match self.context.batch_kind {
            None => self.context.batch_kind = Some(kind),
            Some(current) if current != kind => {
                warn!(batch = %current, message = %kind, "Message kind differs from batch kind");
            }
            Some(_) => {}
        }

        let batch = self
            .parser
            .parse(response.records(), kind, &self.context.registry)?;

        for node in &batch.nodes {
            self.context.registry.set_node(node.clone());
        }
        for link in &batch.links {
            self.context.registry.set_link(link.clone());
        }

        let records = response.records().len();
        debug!(
            pending_nodes = self.context.pending.nodes.len() + batch.nodes.len(),
            pending_links = self.context.pending.links.len() + batch.links.len(),
            "Buffered records"
        );
        self.context.pending.extend(batch);
        Ok(MessageOutcome::Buffered { kind, records })
    }

    /// Finalize the pending batch.
    ///
    /// The pending lists are cleared before anything else happens, so they are
    /// empty after every `done` whether or not the batch applies.
    fn finalize(&mut self) -> Result<Option<BatchReport>, GraphError> {
        let batch = mem::take(&mut self.context.pending);
        let kind = self.context.batch_kind.take();

        let kind = match kind {
            Some(kind) if !batch.is_empty() => kind,
            kind => {
                // A bare `done` answers the oldest outstanding request.
                let answered = match kind {
                    Some(kind) => self.context.retire_kind(&kind.to_string()),
                    None => self.context.outstanding.pop_front(),
                };
                self.release_slot(answered.as_ref());
                debug!(kind = ?kind, answered = ?answered.map(|r| r.kind), "Finalized empty batch");
                return Ok(None);
            }
        };

        match self.apply_batch(kind, &batch) {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                let answered = self.context.retire_kind(&kind.to_string());
                self.release_slot(answered.as_ref());
                error!(error = %err, %kind, "Batch aborted");
                Err(err)
            }
        }
    }

    /// Drop the history slot of an expansion answered without a result
    fn release_slot(&mut self, answered: Option<&OutstandingRequest>) {
        if let Some(request) = answered.filter(|request| request.kind == EXPAND) {
            self.context.history.skip_pending(request.node_id.as_ref());
        }
    }

    fn apply_batch(
        &mut self,
        kind: ResponseKind,
        batch: &ParsedBatch,
    ) -> Result<BatchReport, GraphError> {
        let apply_span = span!(Level::DEBUG, "apply_batch", %kind);
        let _enter = apply_span.enter();

        // The registry holds the latest sighting of every pending node.
        let nodes = batch
            .nodes
            .iter()
            .map(|node| self.context.registry.get_by_id(node.id.as_str()).cloned())
            .collect::<Result<Vec<Node>, GraphError>>()?;

        let policy = self.config.policy_for(kind);
        let diff = compute_diff(&nodes, &batch.links, &self.context.graph);
        let diff = match policy {
            DiffPolicy::Additive => diff.additive(),
            DiffPolicy::Replace => diff,
        };

        let mut staged = self.context.graph.clone();
        match policy {
            DiffPolicy::Additive => GraphMutator::apply_add(&mut staged, &diff),
            DiffPolicy::Replace => GraphMutator::apply(&mut staged, &diff),
        }
        GraphMutator::recompute_link_counts(&mut staged, &mut self.context.registry)?;
        self.context.graph = staged;

        let expanded = if kind == ResponseKind::Expand {
            let expanded = self
                .context
                .history
                .commit(diff.clone(), &nodes, &batch.links);
            match &expanded {
                Some(node_id) => self.context.retire_expansion(node_id),
                None => {
                    self.context.retire_kind(EXPAND);
                }
            }
            expanded
        } else {
            self.context.retire_kind(&kind.to_string());
            None
        };

        info!(%kind, %policy, %diff, "Batch applied");
        self.stream.publish(&self.context.graph);

        Ok(BatchReport {
            kind,
            policy,
            diff,
            expanded,
        })
    }

    /// Request the neighbourhood of a registered node.
    ///
    /// A pending history slot is registered before the request goes out and
    /// withdrawn again if the connection refuses it.
    pub fn node_expand(
        &mut self,
        node_id: &str,
        params: ExpandParams,
    ) -> Result<Request, GraphError> {
        let expand_span = span!(Level::INFO, "node_expand", node_id, neighbors = %params.neighbors);
        let _enter = expand_span.enter();

        let node = self.context.registry.get_by_id(node_id)?;
        let origin = match params.origin {
            Some(origin) => origin,
            None => node
                .primary_label()
                .ok_or_else(|| GraphError::invalid_label(""))?
                .to_string(),
        };
        let uuid = node
            .property("uuid")
            .and_then(|value| value.as_str())
            .unwrap_or(node_id)
            .to_string();
        let id = node.id.clone();

        let replaced = if self.context.history.has_outstanding(node_id) {
            match self.config.duplicate_expand {
                DuplicateExpand::Reject => {
                    warn!(node_id, "Rejected duplicate expansion");
                    return Err(GraphError::already_expanded(node_id));
                }
                DuplicateExpand::Replace => self.context.history.discard(node_id),
            }
        } else {
            None
        };

        let label = params.neighbors.to_string();
        let request = self.dispatcher.request(&Intent::Expand {
            uuid,
            origin,
            neighbors: params.neighbors,
        });
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                if let Some(entry) = replaced {
                    self.context.history.restore(entry);
                }
                return Err(err);
            }
        };

        self.context.history.begin(id.clone(), Some(label));
        if let Err(err) = self.connection.send(&request) {
            self.context.history.cancel_latest(&id);
            if let Some(entry) = replaced {
                self.context.history.restore(entry);
            }
            error!(node_id, error = %err, "Expand request not sent");
            return Err(err);
        }

        self.context.outstanding.push_back(OutstandingRequest {
            kind: request.kind.clone(),
            node_id: Some(id),
        });
        debug!(node_id, "Expand request sent");
        Ok(request)
    }

    /// Reverse the expansion recorded for `node_id`.
    ///
    /// Fails with `NoHistory` when the node has no committed expansion; the
    /// graph is untouched in that case and whenever the collapse aborts.
    pub fn node_collapse(
        &mut self,
        node_id: &str,
        label: Option<&str>,
    ) -> Result<CollapseReport, GraphError> {
        let collapse_span = span!(Level::INFO, "node_collapse", node_id, label = ?label);
        let _enter = collapse_span.enter();

        let entry = self.context.history.take(node_id)?;
        if let (Some(requested), Some(recorded)) = (label, entry.label.as_deref()) {
            if requested != recorded {
                debug!(requested, recorded, "Collapse label differs from expansion label");
            }
        }

        match self.stage_collapse(&entry) {
            Ok((graph, report)) => {
                self.context.graph = graph;
                info!(
                    node_id,
                    applied = %report.applied,
                    retained = report.retained_nodes.len(),
                    "Expansion collapsed"
                );
                self.stream.publish(&self.context.graph);
                Ok(report)
            }
            Err(err) => {
                error!(node_id, error = %err, "Collapse aborted");
                self.context.history.restore(entry);
                Err(err)
            }
        }
    }

    fn stage_collapse(
        &mut self,
        entry: &HistoryEntry,
    ) -> Result<(Graph, CollapseReport), GraphError> {
        let history = &self.context.history;
        let mut applied = entry.diff.clone();

        let mut retained_nodes = Vec::new();
        applied.added_nodes.retain(|node| {
            let keep = history.references_node(node.id.as_str());
            if keep {
                retained_nodes.push(node.id.clone());
            }
            !keep
        });
        let mut retained_links = Vec::new();
        applied.added_links.retain(|link| {
            let keep = history.references_link(link.id.as_str());
            if keep {
                retained_links.push(link.id.clone());
            }
            !keep
        });

        let mut staged = self.context.graph.clone();
        GraphMutator::apply_remove(&mut staged, &applied);
        let pruned_links = if self.config.prune_dangling_links {
            GraphMutator::prune_dangling_links(&mut staged)
                .into_iter()
                .map(|link| link.id)
                .collect()
        } else {
            Vec::new()
        };
        GraphMutator::recompute_link_counts(&mut staged, &mut self.context.registry)?;

        Ok((
            staged,
            CollapseReport {
                node_id: entry.node_id.clone(),
                applied: applied.inverse(),
                retained_nodes,
                retained_links,
                pruned_links,
            },
        ))
    }

    /// Empty the canonical graph and publish the empty snapshot.
    ///
    /// Committed history goes with the graph; the registry and in-flight
    /// expansions are kept.
    pub fn clear_graph(&mut self) {
        info!(
            nodes = self.context.graph.node_count(),
            links = self.context.graph.link_count(),
            "Clearing graph"
        );
        self.context.graph.clear();
        self.context.pending.clear();
        self.context.batch_kind = None;
        self.context.history.clear_entries();
        self.stream.publish(&self.context.graph);
    }

    /// Forget everything, registry and outstanding requests included.
    /// Nothing is published.
    pub fn reset(&mut self) {
        debug!("Resetting session");
        self.context = SessionContext::new();
    }

    /// Dispatch an intent that is not tracked by history
    pub fn send_query(&mut self, intent: &Intent) -> Result<Request, GraphError> {
        let request = self.dispatcher.request(intent)?;
        self.connection.send(&request)?;
        self.context.outstanding.push_back(OutstandingRequest {
            kind: request.kind.clone(),
            node_id: None,
        });
        debug!(kind = %request.kind, "Query sent");
        Ok(request)
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Graph) + 'static) -> SubscriptionId {
        self.stream.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.stream.unsubscribe(id)
    }

    /// Number of snapshots published so far
    pub fn emissions(&self) -> u64 {
        self.stream.emissions()
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn graph(&self) -> &Graph {
        &self.context.graph
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.context.history
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.context.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C: DataConnection + std::fmt::Debug> std::fmt::Debug for GraphSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession")
            .field("context", &self.context)
            .field("config", &self.config)
            .field("stream", &self.stream)
            .field("connection", &self.connection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: i64, label: &str) -> serde_json::Value {
        json!({
            "identity": {"low": id, "high": 0},
            "labels": [label],
            "properties": {"uuid": format!("u{}", id)}
        })
    }

    fn segment(start: i64, end: i64) -> serde_json::Value {
        json!({"segments": [{
            "start": node(start, "Target"),
            "relationship": {"type": "REGULATES", "properties": {}},
            "end": node(end, "Compound")
        }]})
    }

    fn message(kind: &str, fields: Vec<serde_json::Value>) -> String {
        json!({"type": kind, "data": {"_fields": fields}}).to_string()
    }

    const DONE: &str = r#"{"type":"done"}"#;

    fn loaded() -> GraphSession {
        let mut session = GraphSession::in_memory();
        session
            .try_handle_message(&message("load", vec![segment(1, 2)]))
            .unwrap();
        session.try_handle_message(DONE).unwrap();
        session
    }

    #[test]
    fn test_records_buffer_until_done() {
        let mut session = GraphSession::in_memory();
        let outcome = session
            .try_handle_message(&message("load", vec![segment(1, 2)]))
            .unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Buffered {
                kind: ResponseKind::Load,
                records: 1
            }
        );
        assert!(session.graph().is_empty());
        assert_eq!(session.context().pending().nodes.len(), 2);

        let outcome = session.try_handle_message(DONE).unwrap();
        assert!(matches!(outcome, MessageOutcome::Applied(_)));
        assert_eq!(session.graph().node_ids(), vec!["1", "2"]);
        assert!(session.context().pending().is_empty());
        assert_eq!(session.emissions(), 1);
    }

    #[test]
    fn test_expand_sends_parameterised_request() {
        let mut session = loaded();
        let request = session.node_expand("1", ExpandParams::label("Compound")).unwrap();
        assert_eq!(request.kind, "expand");
        assert_eq!(request.params["qParam"], json!("u1"));
        assert!(request.message.contains("(n:Target {uuid: $qParam})"));
        assert_eq!(session.connection().len(), 1);
        assert!(session.history().is_pending("1"));
    }

    #[test]
    fn test_expand_unknown_node_is_not_found() {
        let mut session = GraphSession::in_memory();
        let err = session.node_expand("42", ExpandParams::all()).unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));
        assert!(session.connection().is_empty());
    }

    #[test]
    fn test_duplicate_expand_rejected() {
        let mut session = loaded();
        session.node_expand("1", ExpandParams::all()).unwrap();
        let err = session.node_expand("1", ExpandParams::all()).unwrap_err();
        assert!(matches!(err, GraphError::AlreadyExpanded { .. }));
        assert_eq!(session.connection().len(), 1);
    }

    #[test]
    fn test_expand_collapse_round_trip() {
        let mut session = loaded();
        session.node_expand("1", ExpandParams::all()).unwrap();
        session
            .try_handle_message(&message("expand", vec![segment(1, 3)]))
            .unwrap();
        session.try_handle_message(DONE).unwrap();
        assert_eq!(session.graph().node_ids(), vec!["1", "2", "3"]);
        assert_eq!(session.graph().node("1").unwrap().link_count, 3);

        let report = session.node_collapse("1", Some("All")).unwrap();
        assert_eq!(report.applied.removed_nodes.len(), 1);
        assert_eq!(session.graph().node_ids(), vec!["1", "2"]);
        assert_eq!(session.graph().link_ids(), vec!["12"]);
        assert_eq!(session.graph().node("1").unwrap().link_count, 2);
        assert!(!session.history().contains("1"));
    }

    #[test]
    fn test_clear_graph_publishes_and_keeps_registry() {
        let mut session = loaded();
        session.clear_graph();
        assert!(session.graph().is_empty());
        assert_eq!(session.emissions(), 2);
        assert!(session.registry().contains_node("1"));

        session.reset();
        assert!(!session.registry().contains_node("1"));
    }

    #[test]
    fn test_handle_message_contains_errors() {
        let mut session = loaded();
        assert_eq!(session.handle_message("not json"), None);
        assert_eq!(session.handle_message(&message("expand", vec![])), None);
        assert_eq!(session.graph().node_count(), 2);
    }
}
