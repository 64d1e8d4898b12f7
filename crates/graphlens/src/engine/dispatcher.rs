//! Query dispatcher
//!
//! Maps a user intent to an outbound request. Values always travel as query
//! parameters; the only text spliced into a query is a node label, which
//! must be a plain identifier.

use serde_json::{json, Value};
use std::fmt;

use crate::core::{GraphError, Properties};
use crate::engine::protocol::Request;

/// Which neighbours an expansion asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborFilter {
    All,
    Label(String),
}

impl NeighborFilter {
    /// `"All"` selects every neighbour; anything else is a label
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            NeighborFilter::All
        } else {
            NeighborFilter::Label(value.to_string())
        }
    }
}

impl fmt::Display for NeighborFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeighborFilter::All => write!(f, "All"),
            NeighborFilter::Label(label) => write!(f, "{}", label),
        }
    }
}

/// A user intent the data connection can answer
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    TargetSearch { term: String },
    PatternSearch { term: String },
    CompoundSearch { term: String },
    /// Neighbourhood of the node with the given uuid
    Expand {
        uuid: String,
        origin: String,
        neighbors: NeighborFilter,
    },
    /// REGULATES neighbourhood of a target by uniprot id
    Target { uniprot_id: String },
    /// Same neighbourhood as `Target`, answered on the chembl channel
    Chembl { uniprot_id: String },
    StartNodeSearch { ids: Vec<String> },
    EndNodeSearch { ids: Vec<String> },
    Smiles { pid: String },
    Compound { name: String },
    Uuid { uuid: String },
    /// Shortest paths of up to `distance` hops between two uuid sets
    Path {
        start: Vec<String>,
        end: Vec<String>,
        distance: u32,
    },
    Node { uniprot_id: String },
    /// Neighbour label counts of a node
    Counts { uuid: String, label: String },
}

impl Intent {
    /// Wire name of the intent, echoed back as the response type
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::TargetSearch { .. } => "targetSearch",
            Intent::PatternSearch { .. } => "patternSearch",
            Intent::CompoundSearch { .. } => "compoundSearch",
            Intent::Expand { .. } => "expand",
            Intent::Target { .. } => "target",
            Intent::Chembl { .. } => "chembl",
            Intent::StartNodeSearch { .. } => "startNodeSearch",
            Intent::EndNodeSearch { .. } => "endNodeSearch",
            Intent::Smiles { .. } => "smiles",
            Intent::Compound { .. } => "compound",
            Intent::Uuid { .. } => "uuid",
            Intent::Path { .. } => "path",
            Intent::Node { .. } => "node",
            Intent::Counts { .. } => "counts",
        }
    }
}

/// Stateless builder of outbound requests
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryDispatcher;

impl QueryDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Build the request for an intent
    pub fn request(&self, intent: &Intent) -> Result<Request, GraphError> {
        let (message, params) = match intent {
            Intent::TargetSearch { term } => (
                "MATCH (n:Target) WHERE n.name =~ $qParam2 OR n.uniprot_id =~ $qParam2 \
                 RETURN n.name, n.uniprot_id ORDER BY n.name LIMIT 100 \
                 UNION MATCH (n:Target) WHERE n.name =~ $qParam OR n.uniprot_id =~ $qParam \
                 RETURN n.name, n.uniprot_id ORDER BY n.name LIMIT 100"
                    .to_string(),
                params([
                    ("qParam2", json!(format!("(?i){}.*", regex_escape(term)))),
                    ("qParam", json!(format!("(?i).*{}.*", regex_escape(term)))),
                ]),
            ),
            Intent::PatternSearch { term } => (
                "MATCH (n:Compound) WHERE n.hash =~ $qParam \
                 RETURN n.hash, n.pid ORDER BY n.hash LIMIT 50"
                    .to_string(),
                params([("qParam", json!(format!("{}.*", regex_escape(term))))]),
            ),
            Intent::CompoundSearch { term } => (
                "MATCH (n:Compound) WHERE n.hash =~ $qParam \
                 RETURN n.compound, n.lid ORDER BY n.compound LIMIT 50"
                    .to_string(),
                params([("qParam", json!(format!("{}.*", regex_escape(term))))]),
            ),
            Intent::Expand {
                uuid,
                origin,
                neighbors,
            } => {
                let origin = checked_label(origin)?;
                let neighbor = match neighbors {
                    NeighborFilter::All => "(b)".to_string(),
                    NeighborFilter::Label(label) => format!("(b:{})", checked_label(label)?),
                };
                (
                    format!(
                        "MATCH (n:{origin} {{uuid: $qParam}}) MATCH (n)-[r]-{neighbor} \
                         WITH {{segments: [{{start: startNode(r), relationship: r, end: endNode(r)}}]}} AS ret \
                         RETURN ret LIMIT 100"
                    ),
                    params([("qParam", json!(uuid))]),
                )
            }
            Intent::Target { uniprot_id } | Intent::Chembl { uniprot_id } => (
                "MATCH (n:Target) WHERE n.uniprot_id = $qParam \
                 MATCH (n)-[r:REGULATES]-(b) RETURN n, r, b"
                    .to_string(),
                params([("qParam", json!(uniprot_id))]),
            ),
            Intent::StartNodeSearch { ids } | Intent::EndNodeSearch { ids } => (
                "MATCH (n:Target) WHERE n.uniprot_id IN $qParam RETURN n AS data \
                 UNION MATCH (c:Compound) WHERE c.nostereo_hash IN $qParam RETURN c AS data"
                    .to_string(),
                params([("qParam", json!(ids))]),
            ),
            Intent::Smiles { pid } => (
                "MATCH (n:Pattern) WHERE n.pid = $qParam MATCH (n)-[r]-(b) RETURN n, r, b LIMIT 5"
                    .to_string(),
                params([("qParam", json!(pid))]),
            ),
            Intent::Compound { name } => (
                "MATCH (n:Compound) WHERE n.compound = $qParam \
                 MATCH (n)-[r]-(b) RETURN n, r, b LIMIT 5"
                    .to_string(),
                params([("qParam", json!(name))]),
            ),
            Intent::Uuid { uuid } => (
                "MATCH (n) WHERE n.uuid = $qParam MATCH (n)-[r]-(b) RETURN n, r, b".to_string(),
                params([("qParam", json!(uuid))]),
            ),
            Intent::Path {
                start,
                end,
                distance,
            } => (
                format!(
                    "MATCH p = shortestPath((t)-[r*..{distance}]->(q:Target)) \
                     WHERE t.uuid IN $start AND q.uuid IN $end AND q.uuid <> t.uuid RETURN p"
                ),
                params([("start", json!(start)), ("end", json!(end))]),
            ),
            Intent::Node { uniprot_id } => (
                "MATCH (n:Target) WHERE n.uniprot_id = $qParam RETURN n".to_string(),
                params([("qParam", json!(uniprot_id))]),
            ),
            Intent::Counts { uuid, label } => (
                format!(
                    "MATCH (n:{}) WHERE n.uuid = $qParam MATCH (n)-[r]-(b) \
                     RETURN DISTINCT labels(b), COUNT(labels(b))",
                    checked_label(label)?
                ),
                params([("qParam", json!(uuid))]),
            ),
        };

        Ok(Request {
            kind: intent.kind().to_string(),
            message,
            params,
        })
    }
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> Properties {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn checked_label(label: &str) -> Result<&str, GraphError> {
    let mut chars = label.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(label)
    } else {
        Err(GraphError::invalid_label(label))
    }
}

fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
