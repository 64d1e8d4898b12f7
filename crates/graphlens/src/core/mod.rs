//! Core types shared by every engine component
//!
//! Entity ids, nodes, links, the canonical graph, diffs, configuration,
//! errors and logging.

mod config;
mod error;
pub mod logging;
mod ordered;
mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use ordered::*;
pub use types::*;
