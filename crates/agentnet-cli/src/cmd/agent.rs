//! `agentnet agent`: serve one agent with its bundled tools.

use super::joined;
use crate::cli::AgentKind;
use crate::ui;
use agentnet_api::{agent_router, bind, serve_on};
use agentnet_runtime::tools::{builtin_dispatcher, builtin_profile};
use agentnet_runtime::{
    AgentNode, DiscoveryClient, MessageRouter, PeerClient, ResilientClient, Supervisor,
    ToolRequestHandler,
};
use agentnet_types::config::{AgentConfig, NetConfig};
use agentnet_types::error::{AgentNetError, AgentNetResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line values that win over the `[agent]` section.
#[derive(Debug, Default)]
pub struct AgentOverrides {
    pub kind: Option<AgentKind>,
    pub listen: Option<String>,
    pub endpoint: Option<String>,
    pub discovery: Option<String>,
}

impl AgentOverrides {
    pub fn apply(self, config: &AgentConfig) -> AgentConfig {
        let mut config = config.clone();
        if let Some(kind) = self.kind {
            config.kind = kind.as_str().to_string();
        }
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint;
        }
        if let Some(url) = self.discovery {
            config.discovery_url = url;
        }
        config
    }
}

pub async fn run(config: &NetConfig, overrides: AgentOverrides) -> AgentNetResult<()> {
    let agent = overrides.apply(&config.agent);
    agent.validate()?;
    let profile = builtin_profile(&agent.kind).ok_or_else(|| {
        AgentNetError::Config(format!(
            "agent kind '{}' has no bundled tools (expected 'search' or 'paper')",
            agent.kind
        ))
    })?;

    let client = ResilientClient::new(&config.client);
    let tools = Arc::new(builtin_dispatcher(&agent.kind, &client)?);
    let discovery = DiscoveryClient::new(&agent.discovery_url, client.clone())?;

    let mut capabilities = tools.names();
    capabilities.insert(profile.request_type.to_string());
    let node = AgentNode::from_config(&agent, capabilities, discovery.clone());

    let router = MessageRouter::builder(node.id(), tools.clone())
        .default_tool(profile.tool)
        .handler(
            profile.request_type,
            Arc::new(ToolRequestHandler::new(
                node.id(),
                profile.tool,
                profile.response_type,
                tools.clone(),
            )),
        )
        .peers(PeerClient::new(Arc::new(discovery), client))
        .build()?;

    // Listen before registering so peers never see an unreachable endpoint.
    let listener = bind(&agent.listen).await?;
    let supervisor = Supervisor::new();
    let mut server = tokio::spawn(serve_on(
        listener,
        agent_router(Arc::new(router)),
        supervisor.subscribe(),
    ));

    if let Err(e) = node.start().await {
        supervisor.shutdown();
        if let Err(server_err) = joined(server.await) {
            warn!(error = %server_err, "Agent server failed while aborting startup");
        }
        return Err(e);
    }

    ui::success(&format!("Agent {} is up", node.id()));
    ui::kv("Kind", &agent.kind);
    ui::kv("Endpoint", &node.registration().endpoint);
    ui::kv("Discovery", node.discovery().base_url());
    ui::kv("Tools", &tools.names().into_iter().collect::<Vec<_>>().join(", "));
    ui::hint("Press Ctrl+C to stop");

    let early = tokio::select! {
        _ = supervisor.shutdown_on_ctrl_c() => None,
        result = &mut server => Some(result),
    };

    node.shutdown().await;
    supervisor.shutdown();
    let served = match early {
        Some(result) => result,
        None => server.await,
    };
    info!(agent_id = %node.id(), "Agent stopped");
    joined(served)
}
