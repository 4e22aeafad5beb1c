//! AgentNet CLI: run the discovery service or an agent, or talk to a running
//! network.

mod cli;
mod cmd;
mod config;
mod table;
mod ui;

use crate::cli::{Cli, Commands};
use crate::cmd::agent::AgentOverrides;
use agentnet_types::config::NetConfig;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Commands, config: NetConfig) -> AgentNetResult<()> {
    match command {
        Commands::Discovery { listen } => cmd::discovery::run(&config, listen).await,
        Commands::Agent {
            kind,
            listen,
            endpoint,
            discovery,
        } => {
            let overrides = AgentOverrides {
                kind,
                listen,
                endpoint,
                discovery,
            };
            cmd::agent::run(&config, overrides).await
        }
        Commands::Agents {
            kind,
            capability,
            include_stale,
            discovery,
        } => {
            let filter = cmd::client::agents_filter(kind, capability, include_stale);
            cmd::client::list_agents(&config, discovery, filter).await
        }
        Commands::AgentInfo { id, discovery } => {
            cmd::client::agent_info(&config, discovery, &id).await
        }
        Commands::Send {
            id,
            message_type,
            content,
            discovery,
        } => cmd::client::send(&config, discovery, &id, &message_type, &content).await,
        Commands::Query {
            agent,
            kind,
            tool,
            text,
            discovery,
        } => {
            let (target, query) = cmd::client::build_query(agent, kind, tool, text);
            cmd::client::query(&config, discovery, target, query).await
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let (config, warnings) = config::load_config(cli.config.as_deref());
    init_tracing(&config.log_level, cli.json);
    config::report(cli.config.as_deref(), &warnings);

    let outcome = tokio::runtime::Runtime::new()
        .map_err(|e| AgentNetError::Internal(format!("failed to start tokio runtime: {e}")))
        .and_then(|rt| rt.block_on(run(cli.command, config)));

    if let Err(e) = outcome {
        ui::error(&e.to_string());
        std::process::exit(1);
    }
}
