//! The exploration pipeline
//!
//! Registry, wire protocol, query dispatcher, response parser, diff engine,
//! history tracker, graph mutator and graph stream, wired together by the
//! session.

pub mod connection;
pub mod diff;
pub mod dispatcher;
pub mod history;
pub mod mutator;
pub mod parser;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod stream;

pub use connection::{DataConnection, RequestQueue};
pub use diff::compute_diff;
pub use dispatcher::{Intent, NeighborFilter, QueryDispatcher};
pub use history::{HistoryEntry, HistoryTracker};
pub use mutator::{GraphMutator, LINK_COUNT_BASELINE};
pub use parser::{ParsedBatch, ResponseParser};
pub use protocol::{RawIdentity, RawNode, RawRecord, Request, Response};
pub use registry::EntityRegistry;
pub use session::{
    BatchReport, CollapseReport, ExpandParams, GraphSession, MessageOutcome, OutstandingRequest,
    SessionContext,
};
pub use stream::{GraphStream, SubscriptionId};
