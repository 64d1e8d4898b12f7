//! Command-line interface for the graphlens utility
//!
//! Replays recorded message streams through a graph session and prints the
//! outbound request for any query intent.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, warn};

use graphlens::core::logging::init_logging;
use graphlens::engine::{
    ExpandParams, GraphSession, Intent, NeighborFilter, QueryDispatcher, RequestQueue,
};
use graphlens::{DiffPolicy, DuplicateExpand, SessionConfig};

/// Graphlens - Replay graph database message streams
#[derive(Parser)]
#[command(name = "graphlens")]
#[command(about = "Replay graph database responses through an expand/collapse graph session")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Session configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Diff policy for expand, path and targets batches
    #[arg(long, value_enum, global = true)]
    pub expand_policy: Option<PolicyChoice>,

    /// What to do when an expanded node is expanded again
    #[arg(long, value_enum, global = true)]
    pub duplicate_expand: Option<DuplicateChoice>,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum PolicyChoice {
    Additive,
    Replace,
}

impl From<PolicyChoice> for DiffPolicy {
    fn from(value: PolicyChoice) -> Self {
        match value {
            PolicyChoice::Additive => DiffPolicy::Additive,
            PolicyChoice::Replace => DiffPolicy::Replace,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum DuplicateChoice {
    Reject,
    Replace,
}

impl From<DuplicateChoice> for DuplicateExpand {
    fn from(value: DuplicateChoice) -> Self {
        match value {
            DuplicateChoice::Reject => DuplicateExpand::Reject,
            DuplicateChoice::Replace => DuplicateExpand::Replace,
        }
    }
}

/// JSON output layout
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty when writing to a terminal, compact otherwise
    #[default]
    Auto,
    Pretty,
    Compact,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a newline-delimited stream of messages and actions
    Replay {
        /// Input file, one JSON document per line (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the graph JSON (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every published snapshot instead of only the final graph
        #[arg(long)]
        stream: bool,

        /// Stop at the first message or action that fails
        #[arg(long)]
        strict: bool,

        /// JSON output layout
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },

    /// Print the outbound request for a query intent
    Query {
        #[command(subcommand)]
        intent: QueryCommand,
    },
}

/// Query intents, one per request kind
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QueryCommand {
    TargetSearch {
        term: String,
    },
    PatternSearch {
        term: String,
    },
    CompoundSearch {
        term: String,
    },
    /// Neighbourhood of a node by uuid
    Expand {
        uuid: String,
        /// Label of the expanded node
        #[arg(long)]
        origin: String,
        /// Neighbour label, or All
        #[arg(long, default_value = "All")]
        neighbors: String,
    },
    Target {
        uniprot_id: String,
    },
    Chembl {
        uniprot_id: String,
    },
    StartNodeSearch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    EndNodeSearch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Smiles {
        pid: String,
    },
    Compound {
        name: String,
    },
    Uuid {
        uuid: String,
    },
    /// Shortest paths between two uuid sets
    Path {
        #[arg(long, required = true, num_args = 1..)]
        start: Vec<String>,
        #[arg(long, required = true, num_args = 1..)]
        end: Vec<String>,
        #[arg(long, default_value_t = 3)]
        distance: u32,
    },
    Node {
        uniprot_id: String,
    },
    Counts {
        uuid: String,
        #[arg(long)]
        label: String,
    },
}

impl From<QueryCommand> for Intent {
    fn from(value: QueryCommand) -> Self {
        match value {
            QueryCommand::TargetSearch { term } => Intent::TargetSearch { term },
            QueryCommand::PatternSearch { term } => Intent::PatternSearch { term },
            QueryCommand::CompoundSearch { term } => Intent::CompoundSearch { term },
            QueryCommand::Expand {
                uuid,
                origin,
                neighbors,
            } => Intent::Expand {
                uuid,
                origin,
                neighbors: NeighborFilter::parse(&neighbors),
            },
            QueryCommand::Target { uniprot_id } => Intent::Target { uniprot_id },
            QueryCommand::Chembl { uniprot_id } => Intent::Chembl { uniprot_id },
            QueryCommand::StartNodeSearch { ids } => Intent::StartNodeSearch { ids },
            QueryCommand::EndNodeSearch { ids } => Intent::EndNodeSearch { ids },
            QueryCommand::Smiles { pid } => Intent::Smiles { pid },
            QueryCommand::Compound { name } => Intent::Compound { name },
            QueryCommand::Uuid { uuid } => Intent::Uuid { uuid },
            QueryCommand::Path {
                start,
                end,
                distance,
            } => Intent::Path {
                start,
                end,
                distance,
            },
            QueryCommand::Node { uniprot_id } => Intent::Node { uniprot_id },
            QueryCommand::Counts { uuid, label } => Intent::Counts { uuid, label },
        }
    }
}

/// A scripted user action inside a replay stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ScriptAction {
    Expand {
        id: String,
        #[serde(default)]
        origin: Option<String>,
        #[serde(default)]
        neighbors: Option<String>,
    },
    Collapse {
        id: String,
        #[serde(default)]
        label: Option<String>,
    },
    Clear,
}

/// One line of a replay stream
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayLine {
    Message(String),
    Action(ScriptAction),
}

impl ReplayLine {
    /// Lines carrying an `action` field are user actions; all others are messages
    pub fn parse(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        if value.get("action").is_some() {
            Ok(ReplayLine::Action(serde_json::from_value(value)?))
        } else {
            Ok(ReplayLine::Message(line.to_string()))
        }
    }
}

/// Main CLI application
pub struct GraphlensApp {
    dispatcher: QueryDispatcher,
}

impl GraphlensApp {
    /// Create a new application instance
    pub fn new() -> Self {
        Self {
            dispatcher: QueryDispatcher::new(),
        }
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Initialize logging with CLI flags (environment variables take precedence)
        let log_level_str = std::env::var("GRAPHLENS_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("GRAPHLENS_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Graphlens v{}", env!("CARGO_PKG_VERSION"));
        }

        let config = Self::build_config(&cli)?;

        match cli.command {
            Commands::Replay {
                input,
                output,
                stream,
                strict,
                format,
            } => self.replay_command(input, output, stream, strict, format, config, cli.verbose),
            Commands::Query { intent } => self.query_command(intent),
        }
    }

    /// Resolve the session configuration from the config file and flags
    pub fn build_config(cli: &Cli) -> Result<SessionConfig> {
        let mut config = match &cli.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(policy) = cli.expand_policy {
            config.expand_policy = policy.into();
        }
        if let Some(policy) = cli.duplicate_expand {
            config.duplicate_expand = policy.into();
        }
        Ok(config)
    }

    /// Handle the replay command
    #[allow(clippy::too_many_arguments)]
    fn replay_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        stream: bool,
        strict: bool,
        format: OutputFormat,
        config: SessionConfig,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let pretty = Self::use_pretty(&output, format);
        let rendered = Self::replay(&content, config, stream, strict, pretty)?;
        self.write_output(output, &rendered)
    }

    /// Replay a stream and render the result as JSON
    pub fn replay(
        content: &str,
        config: SessionConfig,
        stream: bool,
        strict: bool,
        pretty: bool,
    ) -> Result<String> {
        let mut session = GraphSession::with_config(RequestQueue::new(), config);

        let snapshots = Rc::new(RefCell::new(Vec::new()));
        if stream {
            let sink = Rc::clone(&snapshots);
            session.subscribe(move |graph| match serde_json::to_value(graph) {
                Ok(value) => sink.borrow_mut().push(value),
                Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
            });
        }

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line_no = index + 1;
            let parsed =
                ReplayLine::parse(line).with_context(|| format!("Invalid JSON on line {}", line_no));
            let result = parsed.and_then(|parsed| Self::replay_line(&mut session, parsed));
            match result {
                Ok(()) => {}
                Err(e) if strict => return Err(e.context(format!("Replay failed on line {}", line_no))),
                Err(e) => warn!(line = line_no, error = %format!("{:#}", e), "Skipped line"),
            }
        }

        debug!(
            nodes = session.graph().node_count(),
            links = session.graph().link_count(),
            requests = session.connection().len(),
            "Replay finished"
        );

        let value = if stream {
            serde_json::Value::Array(snapshots.borrow().clone())
        } else {
            serde_json::to_value(session.graph())?
        };
        let rendered = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(rendered)
    }

    fn replay_line(session: &mut GraphSession<RequestQueue>, line: ReplayLine) -> Result<()> {
        match line {
            ReplayLine::Message(message) => {
                session.try_handle_message(&message)?;
            }
            ReplayLine::Action(ScriptAction::Expand {
                id,
                origin,
                neighbors,
            }) => {
                let params = ExpandParams {
                    origin,
                    neighbors: NeighborFilter::parse(neighbors.as_deref().unwrap_or("All")),
                };
                session.node_expand(&id, params)?;
            }
            ReplayLine::Action(ScriptAction::Collapse { id, label }) => {
                session.node_collapse(&id, label.as_deref())?;
            }
            ReplayLine::Action(ScriptAction::Clear) => session.clear_graph(),
        }
        Ok(())
    }

    /// Handle the query command
    fn query_command(&self, intent: QueryCommand) -> Result<()> {
        let request = self.dispatcher.request(&intent.into())?;
        println!("{}", serde_json::to_string_pretty(&request)?);
        Ok(())
    }

    /// Decide the JSON layout for the output destination
    fn use_pretty(output: &Option<PathBuf>, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Pretty => true,
            OutputFormat::Compact => false,
            OutputFormat::Auto => match output {
                None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                Some(ref p) if p.to_str() == Some("-") => {
                    crossterm::tty::IsTty::is_tty(&std::io::stdout())
                }
                Some(_) => false,
            },
        }
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, &content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for GraphlensApp {
    fn default() -> Self {
        Self::new()
    }
}
