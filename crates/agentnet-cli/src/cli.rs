//! Clap CLI definitions for AgentNet.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  agentnet discovery                       Run the discovery service
  agentnet agent --kind search             Run a web search agent
  agentnet agent --kind paper --listen 127.0.0.1:8002
  agentnet agents --include-stale          List registered agents
  agentnet query --kind paper \"diffusion models\"
  agentnet send search-1a2b3c4d message \"hello\"";

/// AgentNet: discovery and messaging for cooperating agents.
#[derive(Parser)]
#[command(name = "agentnet", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Agent kinds with bundled tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    Search,
    Paper,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Search => "search",
            AgentKind::Paper => "paper",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the discovery service.
    Discovery {
        /// Listen address (overrides `discovery.listen`).
        #[arg(long)]
        listen: Option<String>,
    },
    /// Run an agent with the bundled tools for its kind.
    Agent {
        /// Agent kind (overrides `agent.kind`).
        #[arg(long, value_enum)]
        kind: Option<AgentKind>,
        /// Listen address (overrides `agent.listen`).
        #[arg(long)]
        listen: Option<String>,
        /// Public base URL advertised to discovery.
        #[arg(long)]
        endpoint: Option<String>,
        /// Discovery service URL (overrides `agent.discovery_url`).
        #[arg(long)]
        discovery: Option<String>,
    },
    /// List registered agents.
    Agents {
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        capability: Option<String>,
        /// Include agents that missed their heartbeat TTL.
        #[arg(long)]
        include_stale: bool,
        /// Discovery service URL (overrides `agent.discovery_url`).
        #[arg(long)]
        discovery: Option<String>,
    },
    /// Show one agent's registration.
    AgentInfo {
        id: String,
        #[arg(long)]
        discovery: Option<String>,
    },
    /// Send a message to an agent.
    Send {
        /// Recipient agent id.
        id: String,
        /// Routing tag, e.g. `message`, `query`, `search_request`.
        message_type: String,
        /// Text, or a JSON document.
        content: String,
        #[arg(long)]
        discovery: Option<String>,
    },
    /// Ask an agent a question.
    Query {
        /// Agent id to ask.
        #[arg(long, conflicts_with = "kind")]
        agent: Option<String>,
        /// Ask the first active agent of this kind.
        #[arg(long)]
        kind: Option<String>,
        /// Tool to invoke; the text becomes its `query` argument.
        #[arg(long)]
        tool: Option<String>,
        text: String,
        #[arg(long)]
        discovery: Option<String>,
    },
}
