//! Core error types for graph session processing
//!
//! This module defines the error taxonomy shared by the registry, parser,
//! mutator, history tracker and session.

use thiserror::Error;

use crate::core::ResponseKind;

/// Core error types for graph session processing
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Empty response: {kind} response carried no records")]
    EmptyResponse { kind: ResponseKind },

    #[error("Entity not found: {id}")]
    NotFound { id: String },

    #[error("No history: node {id} has no expansion to collapse")]
    NoHistory { id: String },

    #[error("Already expanded: node {id} has an outstanding expansion")]
    AlreadyExpanded { id: String },

    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    #[error("Unsupported message: {kind} responses are not graph batches")]
    UnsupportedMessage { kind: String },

    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    #[error("Invalid label: {label:?} is not a valid identifier")]
    InvalidLabel { label: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl GraphError {
    /// Create a new empty-response error
    pub fn empty_response(kind: ResponseKind) -> Self {
        Self::EmptyResponse { kind }
    }

    /// Create a new not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new no-history error
    pub fn no_history(id: impl Into<String>) -> Self {
        Self::NoHistory { id: id.into() }
    }

    /// Create a new already-expanded error
    pub fn already_expanded(id: impl Into<String>) -> Self {
        Self::AlreadyExpanded { id: id.into() }
    }

    /// Create a new malformed-message error
    pub fn malformed_message(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Create a new unsupported-message error
    pub fn unsupported_message(kind: impl Into<String>) -> Self {
        Self::UnsupportedMessage { kind: kind.into() }
    }

    /// Create a new malformed-record error
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Create a new invalid-label error
    pub fn invalid_label(label: impl Into<String>) -> Self {
        Self::InvalidLabel {
            label: label.into(),
        }
    }

    /// Create a new connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a defect in the current operation
    /// rather than a user-level no-op.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphError::NotFound { .. })
    }
}
