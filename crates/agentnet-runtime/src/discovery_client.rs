//! HTTP client for a remote discovery service.

use crate::client::{CallOptions, HttpRequest, Method, ResilientClient};
use agentnet_registry::AgentDirectory;
use agentnet_types::agent::{AgentFilter, AgentList, AgentRecord, AgentRegistration, AgentStatus};
use agentnet_types::error::{AgentNetError, AgentNetResult};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

/// Talks to the discovery service's HTTP API.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    base: Url,
    client: ResilientClient,
}

impl DiscoveryClient {
    pub fn new(base_url: &str, client: ResilientClient) -> AgentNetResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AgentNetError::Config(format!("invalid discovery URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(AgentNetError::Config(format!(
                "discovery URL '{base_url}' cannot be a base"
            )));
        }
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, segments: &[&str]) -> AgentNetResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AgentNetError::Config("discovery URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Register an agent. Retried: a repeat is reported as `Conflict`,
    /// which callers resolve against the existing record.
    pub async fn register(&self, registration: &AgentRegistration) -> AgentNetResult<AgentRecord> {
        let body = serde_json::to_value(registration)?;
        let url = self.url(&["register"])?;
        debug!(agent_id = %registration.id, %url, "Registering with discovery");
        self.client
            .call_json(HttpRequest::post(url.as_str(), body), &CallOptions::idempotent())
            .await
    }

    pub async fn unregister(&self, id: &str) -> AgentNetResult<()> {
        let url = self.url(&["unregister", id])?;
        self.client
            .call(
                HttpRequest::new(Method::Delete, url.as_str()),
                &CallOptions::idempotent(),
            )
            .await?;
        Ok(())
    }

    pub async fn heartbeat(&self, id: &str) -> AgentNetResult<()> {
        let url = self.url(&["heartbeat", id])?;
        self.client
            .call(
                HttpRequest::new(Method::Put, url.as_str()),
                &CallOptions::idempotent(),
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> AgentNetResult<AgentRecord> {
        let url = self.url(&["agent", id])?;
        self.client
            .call_json(HttpRequest::get(url.as_str()), &CallOptions::idempotent())
            .await
    }

    /// List agents. STALE records are requested only when the filter asks
    /// for them.
    pub async fn list(&self, filter: &AgentFilter) -> AgentNetResult<Vec<AgentRecord>> {
        let mut url = self.url(&["agents"])?;
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if let Some(kind) = &filter.kind {
            pairs.push(("kind", kind.as_str()));
        }
        if let Some(capability) = &filter.capability {
            pairs.push(("capability", capability.as_str()));
        }
        if filter.statuses.contains(&AgentStatus::Stale) {
            pairs.push(("include_stale", "true"));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let list: AgentList = self
            .client
            .call_json(HttpRequest::get(url.as_str()), &CallOptions::idempotent())
            .await?;
        Ok(list.agents)
    }
}

#[async_trait]
impl AgentDirectory for DiscoveryClient {
    async fn get_agent(&self, id: &str) -> AgentNetResult<AgentRecord> {
        self.get(id).await
    }

    async fn list_agents(&self, filter: &AgentFilter) -> AgentNetResult<Vec<AgentRecord>> {
        self.list(filter).await
    }
}
