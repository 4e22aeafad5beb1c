//! Agent lookup abstraction.

use agentnet_types::agent::{AgentFilter, AgentRecord};
use agentnet_types::error::AgentNetResult;
use async_trait::async_trait;

/// Read-only view of the discovery registry.
///
/// Implemented by the in-process [`DiscoveryService`](crate::DiscoveryService)
/// and by remote discovery clients, so message routing can resolve targets
/// without caring where the registry lives.
#[async_trait]
pub trait AgentDirectory: Send + Sync + 'static {
    /// Fetch one agent. Fails with `NotFound` if it is not registered.
    async fn get_agent(&self, id: &str) -> AgentNetResult<AgentRecord>;

    /// List agents. An empty status filter means ACTIVE only.
    async fn list_agents(&self, filter: &AgentFilter) -> AgentNetResult<Vec<AgentRecord>>;
}
