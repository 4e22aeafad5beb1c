//! `agentnet discovery`: registry, liveness sweeper and HTTP surface.

use super::joined;
use crate::ui;
use agentnet_api::server::local_addr;
use agentnet_api::{bind, discovery_router, serve_on};
use agentnet_registry::{DiscoveryService, LivenessPolicy, RegistryStore};
use agentnet_runtime::Supervisor;
use agentnet_types::config::NetConfig;
use agentnet_types::error::AgentNetResult;
use tracing::error;

pub async fn run(config: &NetConfig, listen: Option<String>) -> AgentNetResult<()> {
    let listen = listen.unwrap_or_else(|| config.discovery.listen.clone());
    let policy = LivenessPolicy::from_config(&config.discovery)?;
    let service = DiscoveryService::new(RegistryStore::new().with_policy(policy));
    let supervisor = Supervisor::new();

    let listener = bind(&listen).await?;
    let addr = local_addr(&listener)?;
    let mut sweeper = service
        .sweeper(config.discovery.sweep_interval())
        .spawn(supervisor.subscribe());
    let server = tokio::spawn(serve_on(
        listener,
        discovery_router(service),
        supervisor.subscribe(),
    ));

    ui::success(&format!("Discovery service listening on http://{addr}"));
    ui::kv("Heartbeat", &format!("{}s", config.discovery.heartbeat_ttl_secs));
    ui::kv("Eviction", &format!("{}s", config.discovery.eviction_ttl_secs));
    ui::kv("Sweep", &format!("{}s", config.discovery.sweep_interval().as_secs()));
    ui::hint("Press Ctrl+C to stop");

    // The sweeper only finishes early when the registry is corrupted.
    let early = tokio::select! {
        _ = supervisor.shutdown_on_ctrl_c() => None,
        result = &mut sweeper => Some(result),
    };
    supervisor.shutdown();

    let swept = match early {
        Some(result) => result,
        None => sweeper.await,
    };
    let served = joined(server.await);
    if let Err(e) = &served {
        error!(error = %e, "Discovery server failed");
    }
    joined(swept)?;
    served
}
