//! Calls from one agent to another.

use crate::client::{CallOptions, HttpRequest, ResilientClient};
use agentnet_registry::AgentDirectory;
use agentnet_types::agent::{AgentFilter, AgentRecord};
use agentnet_types::error::{AgentNetError, AgentNetResult};
use agentnet_types::message::{Message, QueryRequest, QueryTarget};
use std::sync::Arc;
use tracing::debug;

/// Resolves agents through a directory and calls their HTTP endpoints.
#[derive(Clone)]
pub struct PeerClient {
    directory: Arc<dyn AgentDirectory>,
    client: ResilientClient,
}

impl std::fmt::Debug for PeerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl PeerClient {
    pub fn new(directory: Arc<dyn AgentDirectory>, client: ResilientClient) -> Self {
        Self { directory, client }
    }

    pub fn directory(&self) -> &Arc<dyn AgentDirectory> {
        &self.directory
    }

    /// Pick the agent a target refers to.
    ///
    /// An explicit id is looked up directly. Otherwise the first ACTIVE agent
    /// matching kind and capability wins, skipping `exclude`.
    pub async fn resolve(
        &self,
        target: &QueryTarget,
        exclude: Option<&str>,
    ) -> AgentNetResult<AgentRecord> {
        if let Some(id) = &target.agent_id {
            return self.directory.get_agent(id).await;
        }

        let mut filter = AgentFilter::active();
        filter.kind = target.kind.clone();
        filter.capability = target.capability.clone();

        self.directory
            .list_agents(&filter)
            .await?
            .into_iter()
            .find(|r| Some(r.id.as_str()) != exclude)
            .ok_or_else(|| {
                AgentNetError::NotFound(format!(
                    "no active agent matches kind={} capability={}",
                    target.kind.as_deref().unwrap_or("*"),
                    target.capability.as_deref().unwrap_or("*"),
                ))
            })
    }

    /// Deliver a message to an agent by id. Sent once; messages are not
    /// assumed idempotent.
    pub async fn send_message(
        &self,
        target_id: &str,
        message: &Message,
    ) -> AgentNetResult<serde_json::Value> {
        let record = self.directory.get_agent(target_id).await?;
        let url = endpoint_url(&record.endpoint, "message");
        debug!(target = %target_id, message_type = %message.message_type, %url, "Sending message");
        self.client
            .call_json(
                HttpRequest::post(url, serde_json::to_value(message)?),
                &CallOptions::once(),
            )
            .await
    }

    /// Post a query to an agent's `/query` endpoint. Retried only when the
    /// query declares itself idempotent.
    pub async fn query(
        &self,
        record: &AgentRecord,
        query: &QueryRequest,
    ) -> AgentNetResult<serde_json::Value> {
        let url = endpoint_url(&record.endpoint, "query");
        let options = if query.idempotent {
            CallOptions::idempotent()
        } else {
            CallOptions::once()
        };
        debug!(target = %record.id, %url, idempotent = query.idempotent, "Relaying query");
        self.client
            .call_json(HttpRequest::post(url, serde_json::to_value(query)?), &options)
            .await
    }
}

/// `{endpoint}/{path}` without doubled slashes.
pub fn endpoint_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_over, json_response, MockTransport};
    use agentnet_registry::{DiscoveryService, RegistryStore};
    use agentnet_types::agent::AgentRegistration;
    use serde_json::json;

    fn directory() -> Arc<DiscoveryService> {
        let service = DiscoveryService::new(RegistryStore::new());
        service
            .register(AgentRegistration::new("paper-1", "p1", "paper", "http://p1:8002/"))
            .unwrap();
        service
            .register(
                AgentRegistration::new("search-1", "s1", "search", "http://s1:8001")
                    .with_capability("web_search"),
            )
            .unwrap();
        Arc::new(service)
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(endpoint_url("http://h:1/", "query"), "http://h:1/query");
        assert_eq!(endpoint_url("http://h:1", "message"), "http://h:1/message");
    }

    #[tokio::test]
    async fn test_resolve_by_id_kind_and_capability() {
        let transport = MockTransport::new(|_| Ok(json_response(200, json!({}))));
        let peers = PeerClient::new(directory(), client_over(transport));

        let by_id = peers.resolve(&QueryTarget::agent("paper-1"), None).await.unwrap();
        assert_eq!(by_id.kind, "paper");

        let by_kind = peers.resolve(&QueryTarget::kind("search"), None).await.unwrap();
        assert_eq!(by_kind.id, "search-1");

        let by_cap = QueryTarget {
            capability: Some("web_search".into()),
            ..QueryTarget::default()
        };
        assert_eq!(peers.resolve(&by_cap, None).await.unwrap().id, "search-1");

        assert!(matches!(
            peers.resolve(&QueryTarget::kind("search"), Some("search-1")).await,
            Err(AgentNetError::NotFound(_))
        ));
        assert!(matches!(
            peers.resolve(&QueryTarget::agent("ghost"), None).await,
            Err(AgentNetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_send_message_posts_once() {
        let transport = MockTransport::new(|_| Ok(json_response(502, json!({}))));
        let peers = PeerClient::new(directory(), client_over(transport.clone()));

        let msg = Message::new("cli", "message", json!("hello"));
        assert!(peers.send_message("paper-1", &msg).await.is_err());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://p1:8002/message");
        assert_eq!(requests[0].body.as_ref().unwrap()["sender_id"], "cli");
    }

    #[tokio::test]
    async fn test_idempotent_query_is_retried() {
        let transport = MockTransport::new(|_| Ok(json_response(503, json!({}))));
        let peers = PeerClient::new(directory(), client_over(transport.clone()));
        let record = peers.resolve(&QueryTarget::agent("search-1"), None).await.unwrap();

        let mut query = QueryRequest::text("rust");
        query.idempotent = true;
        assert!(matches!(
            peers.query(&record, &query).await,
            Err(AgentNetError::RetriesExhausted { attempts: 2, .. })
        ));
        assert_eq!(transport.requests()[0].url, "http://s1:8001/query");
    }
}
