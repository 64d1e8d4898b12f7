//! Session configuration
//!
//! `SessionConfig` controls how finalized batches are applied and how repeated
//! expansions of one node are handled. Every field has a default, so a partial
//! JSON document is a valid configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{GraphError, ResponseKind};

/// How a computed diff is applied to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffPolicy {
    /// Apply only the added side; nothing already visible disappears
    #[default]
    Additive,
    /// Apply both sides; the graph becomes the batch's result set
    Replace,
}

impl FromStr for DiffPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "additive" => Ok(DiffPolicy::Additive),
            "replace" => Ok(DiffPolicy::Replace),
            _ => Err(format!("Unknown diff policy: {}", s)),
        }
    }
}

impl fmt::Display for DiffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffPolicy::Additive => write!(f, "additive"),
            DiffPolicy::Replace => write!(f, "replace"),
        }
    }
}

/// What happens when a node with an outstanding expansion is expanded again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateExpand {
    /// Fail with `AlreadyExpanded` and dispatch nothing
    #[default]
    Reject,
    /// Discard the old entry; the new expansion's diff takes its place
    Replace,
}

impl FromStr for DuplicateExpand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(DuplicateExpand::Reject),
            "replace" => Ok(DuplicateExpand::Replace),
            _ => Err(format!("Unknown duplicate-expand policy: {}", s)),
        }
    }
}

/// Configuration for a graph session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Policy for `expand`, `path` and `targets` batches
    pub expand_policy: DiffPolicy,
    pub duplicate_expand: DuplicateExpand,
    /// Drop links left without an endpoint after a collapse
    pub prune_dangling_links: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expand_policy: DiffPolicy::Additive,
            duplicate_expand: DuplicateExpand::Reject,
            prune_dangling_links: true,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document
    pub fn from_json(input: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with_expand_policy(mut self, policy: DiffPolicy) -> Self {
        self.expand_policy = policy;
        self
    }

    pub fn with_duplicate_expand(mut self, policy: DuplicateExpand) -> Self {
        self.duplicate_expand = policy;
        self
    }

    /// Diff policy used when finalizing a batch of the given kind.
    ///
    /// Loads always replace the graph.
    pub fn policy_for(&self, kind: ResponseKind) -> DiffPolicy {
        match kind {
            ResponseKind::Load => DiffPolicy::Replace,
            _ => self.expand_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.expand_policy, DiffPolicy::Additive);
        assert_eq!(config.duplicate_expand, DuplicateExpand::Reject);
        assert!(config.prune_dangling_links);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{"expand_policy": "replace"}"#).unwrap();
        assert_eq!(config.expand_policy, DiffPolicy::Replace);
        assert_eq!(config.duplicate_expand, DuplicateExpand::Reject);
        assert!(config.prune_dangling_links);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(SessionConfig::from_json(r#"{"expand_policy": "sideways"}"#).is_err());
    }

    #[test]
    fn test_policy_for_load_is_replace() {
        let config = SessionConfig::default();
        assert_eq!(config.policy_for(ResponseKind::Load), DiffPolicy::Replace);
        assert_eq!(config.policy_for(ResponseKind::Expand), DiffPolicy::Additive);
        assert_eq!(config.policy_for(ResponseKind::Path), DiffPolicy::Additive);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(DiffPolicy::from_str("Additive").unwrap(), DiffPolicy::Additive);
        assert_eq!(DiffPolicy::from_str("replace").unwrap(), DiffPolicy::Replace);
        assert!(DiffPolicy::from_str("merge").is_err());
        assert_eq!(
            DuplicateExpand::from_str("REPLACE").unwrap(),
            DuplicateExpand::Replace
        );
    }
}
