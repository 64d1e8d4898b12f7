//! History tracker
//!
//! Each expansion registers a skeleton entry before its request goes out.
//! When the expansion's batch finalizes, the skeleton it answers is filled in
//! place with the applied diff and stored under the expanded node's id, where
//! a later collapse takes it back out.
//!
//! Overlapping expansions are not merged. An entry also remembers every node
//! and link its result referenced, so a collapse can leave visible what
//! another outstanding expansion still refers to.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::core::{Diff, GraphError, Link, LinkId, Node, NodeId};

/// The recorded outcome of one expansion
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Node whose neighbourhood was expanded
    pub node_id: NodeId,
    /// Neighbour label the expansion asked for
    pub label: Option<String>,
    /// The diff the expansion applied
    pub diff: Diff,
    /// Every node id present in the expansion's result
    pub referenced_nodes: HashSet<NodeId>,
    /// Every link id present in the expansion's result
    pub referenced_links: HashSet<LinkId>,
}

impl HistoryEntry {
    /// Create an empty skeleton for an expansion in flight
    pub fn skeleton(node_id: NodeId, label: Option<String>) -> Self {
        Self {
            node_id,
            label,
            diff: Diff::new(),
            referenced_nodes: HashSet::new(),
            referenced_links: HashSet::new(),
        }
    }
}

/// Per-node expansion history for one session
#[derive(Debug, Default, Clone)]
pub struct HistoryTracker {
    entries: HashMap<NodeId, HistoryEntry>,
    pending: VecDeque<HistoryEntry>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skeleton for an expansion about to be dispatched
    pub fn begin(&mut self, node_id: NodeId, label: Option<String>) {
        debug!(node_id = %node_id, label = ?label, "Expansion pending");
        self.pending.push_back(HistoryEntry::skeleton(node_id, label));
    }

    /// Withdraw the most recent skeleton for `node_id`, used when dispatch fails
    pub fn cancel_latest(&mut self, node_id: &NodeId) -> Option<HistoryEntry> {
        let index = self.pending.iter().rposition(|entry| &entry.node_id == node_id)?;
        self.pending.remove(index)
    }

    /// Fill the skeleton the finalized batch answers and store it.
    ///
    /// The answered slot belongs to the first pending node that has one; an
    /// expansion's own node leads its result. Without any match the oldest
    /// slot is used. Responses arrive in request order, so slots older than
    /// the answered one lost their response and are dropped.
    ///
    /// Returns the node id the entry was stored under, or `None` when no
    /// expansion was pending.
    pub fn commit(
        &mut self,
        diff: Diff,
        pending_nodes: &[Node],
        pending_links: &[Link],
    ) -> Option<NodeId> {
        let position = pending_nodes
            .iter()
            .find_map(|node| self.pending.iter().position(|slot| slot.node_id == node.id))
            .unwrap_or(0);
        for orphan in self.pending.drain(..position) {
            warn!(node_id = %orphan.node_id, "Dropped expansion whose response never arrived");
        }
        let Some(mut entry) = self.pending.pop_front() else {
            warn!("Expand batch finalized with no pending expansion");
            return None;
        };

        entry.diff = diff;
        entry.referenced_nodes = pending_nodes.iter().map(|node| node.id.clone()).collect();
        entry.referenced_links = pending_links.iter().map(|link| link.id.clone()).collect();

        let node_id = entry.node_id.clone();
        debug!(node_id = %node_id, diff = %entry.diff, "Expansion recorded");
        if self.entries.insert(node_id.clone(), entry).is_some() {
            warn!(node_id = %node_id, "Replaced an outstanding expansion entry");
        }
        Some(node_id)
    }

    /// Drop a skeleton because its expansion returned nothing.
    ///
    /// Takes the oldest slot for `node_id`, or the oldest slot overall.
    pub fn skip_pending(&mut self, node_id: Option<&NodeId>) -> Option<HistoryEntry> {
        let position = match node_id {
            Some(id) => self.pending.iter().position(|slot| &slot.node_id == id)?,
            None => 0,
        };
        let skipped = self.pending.remove(position);
        if let Some(entry) = &skipped {
            debug!(node_id = %entry.node_id, "Expansion returned no records");
        }
        skipped
    }

    /// Remove and return the entry for `node_id`
    pub fn take(&mut self, node_id: &str) -> Result<HistoryEntry, GraphError> {
        self.entries
            .remove(node_id)
            .ok_or_else(|| GraphError::no_history(node_id))
    }

    /// Put back an entry taken by a collapse that could not be applied
    pub fn restore(&mut self, entry: HistoryEntry) {
        self.entries.insert(entry.node_id.clone(), entry);
    }

    /// Drop the committed entry for `node_id` without collapsing it.
    ///
    /// Pending slots are left alone; their batches are still on the way.
    pub fn discard(&mut self, node_id: &str) -> Option<HistoryEntry> {
        let discarded = self.entries.remove(node_id);
        if discarded.is_some() {
            debug!(node_id, "Expansion entry discarded");
        }
        discarded
    }

    pub fn get(&self, node_id: &str) -> Option<&HistoryEntry> {
        self.entries.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.entries.contains_key(node_id)
    }

    pub fn is_pending(&self, node_id: &str) -> bool {
        self.pending.iter().any(|entry| entry.node_id.as_str() == node_id)
    }

    /// True if a committed or pending expansion exists for `node_id`
    pub fn has_outstanding(&self, node_id: &str) -> bool {
        self.contains(node_id) || self.is_pending(node_id)
    }

    /// True if any stored entry's result referenced the node
    pub fn references_node(&self, node_id: &str) -> bool {
        self.entries
            .values()
            .any(|entry| entry.referenced_nodes.contains(node_id))
    }

    /// True if any stored entry's result referenced the link
    pub fn references_link(&self, link_id: &str) -> bool {
        self.entries
            .values()
            .any(|entry| entry.referenced_links.contains(link_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Ids with a stored entry, sorted
    pub fn expanded_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(NodeId::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Drop committed entries, keeping expansions still in flight
    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}
