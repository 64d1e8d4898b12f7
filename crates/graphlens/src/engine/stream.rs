//! Graph stream
//!
//! Synchronous broadcast of full graph snapshots. Subscribers always receive
//! the whole graph, never a patch, so a subscriber that skips an emission
//! loses nothing but an intermediate state.

use tracing::trace;

use crate::core::Graph;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Graph)>;

/// Observer list for graph snapshots
#[derive(Default)]
pub struct GraphStream {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
    emissions: u64,
}

impl GraphStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Graph) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Deliver the current graph to every subscriber
    pub fn publish(&mut self, graph: &Graph) {
        self.emissions += 1;
        trace!(
            subscribers = self.subscribers.len(),
            nodes = graph.node_count(),
            links = graph.link_count(),
            "Publishing graph"
        );
        for (_, subscriber) in &mut self.subscribers {
            subscriber(graph);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of snapshots published so far
    pub fn emissions(&self) -> u64 {
        self.emissions
    }
}

impl std::fmt::Debug for GraphStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStream")
            .field("subscribers", &self.subscribers.len())
            .field("emissions", &self.emissions)
            .finish()
    }
}
