//! Inbound message routing.
//!
//! The routing table maps a `message_type` to its handler and is fixed once
//! [`MessageRouterBuilder::build`] returns. `"message"` goes to the free-form
//! handler, `"query"` is parsed into a [`QueryRequest`] and answered locally
//! or relayed to another agent, and extra typed handlers may be added at
//! startup. Anything else is `UnsupportedType`.

use crate::peer::PeerClient;
use crate::tools::ToolDispatcher;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use agentnet_types::message::{
    json_type_name, Message, QueryRequest, RouteReply, MESSAGE_TYPE_MESSAGE, MESSAGE_TYPE_QUERY,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handles one routed message type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> AgentNetResult<Value>;
}

/// Default free-form handler: acknowledges the message.
#[derive(Debug, Clone)]
pub struct AckHandler {
    agent_id: String,
}

impl AckHandler {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
        }
    }
}

#[async_trait]
impl MessageHandler for AckHandler {
    async fn handle(&self, message: &Message) -> AgentNetResult<Value> {
        info!(from = %message.sender_id, agent_id = %self.agent_id, "Message received");
        Ok(json!({
            "status": "received",
            "agent_id": self.agent_id,
            "from": message.sender_id,
        }))
    }
}

/// Runs one tool on a typed request and answers with a typed response
/// message, e.g. `search_request` → `web_search` → `search_response`.
pub struct ToolRequestHandler {
    agent_id: String,
    tool: String,
    response_type: String,
    tools: Arc<ToolDispatcher>,
}

impl ToolRequestHandler {
    pub fn new(
        agent_id: impl Into<String>,
        tool: impl Into<String>,
        response_type: impl Into<String>,
        tools: Arc<ToolDispatcher>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            tool: tool.into(),
            response_type: response_type.into(),
            tools,
        }
    }
}

#[async_trait]
impl MessageHandler for ToolRequestHandler {
    async fn handle(&self, message: &Message) -> AgentNetResult<Value> {
        let arguments = match &message.content {
            Value::String(text) => {
                let mut args = Map::new();
                args.insert("query".to_string(), Value::String(text.clone()));
                args
            }
            Value::Object(map) => map.clone(),
            other => {
                return Err(AgentNetError::Validation(format!(
                    "'{}' content must be a string or object, got {}",
                    message.message_type,
                    json_type_name(other)
                )))
            }
        };
        let result = self.tools.invoke(&self.tool, &arguments).await?;
        let reply = Message::new(
            self.agent_id.as_str(),
            self.response_type.as_str(),
            serde_json::to_value(result)?,
        )
        .to(message.sender_id.as_str());
        Ok(serde_json::to_value(reply)?)
    }
}

enum Route {
    FreeForm,
    Query,
    Custom(Arc<dyn MessageHandler>),
}

/// Startup-time construction of a [`MessageRouter`].
pub struct MessageRouterBuilder {
    agent_id: String,
    tools: Arc<ToolDispatcher>,
    free_form: Arc<dyn MessageHandler>,
    custom: HashMap<String, Arc<dyn MessageHandler>>,
    default_tool: Option<String>,
    peers: Option<PeerClient>,
}

impl MessageRouterBuilder {
    /// Free-form handler for `"message"`. Defaults to [`AckHandler`].
    pub fn free_form(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.free_form = handler;
        self
    }

    /// Extra typed handler.
    pub fn handler(mut self, message_type: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        self.custom.insert(message_type.into(), handler);
        self
    }

    /// Tool used for text-only queries.
    pub fn default_tool(mut self, tool: impl Into<String>) -> Self {
        self.default_tool = Some(tool.into());
        self
    }

    /// Enable relaying queries to other agents.
    pub fn peers(mut self, peers: PeerClient) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn build(self) -> AgentNetResult<MessageRouter> {
        if let Some(tool) = &self.default_tool {
            if !self.tools.contains(tool) {
                return Err(AgentNetError::Config(format!(
                    "default tool '{tool}' is not registered"
                )));
            }
        }

        let mut routes: HashMap<String, Route> = HashMap::new();
        routes.insert(MESSAGE_TYPE_MESSAGE.to_string(), Route::FreeForm);
        routes.insert(MESSAGE_TYPE_QUERY.to_string(), Route::Query);
        for (message_type, handler) in self.custom {
            if routes.contains_key(&message_type) {
                return Err(AgentNetError::Config(format!(
                    "message type '{message_type}' is reserved"
                )));
            }
            routes.insert(message_type, Route::Custom(handler));
        }

        Ok(MessageRouter {
            agent_id: self.agent_id,
            routes,
            free_form: self.free_form,
            tools: self.tools,
            default_tool: self.default_tool,
            peers: self.peers,
        })
    }
}

/// Dispatches inbound messages by type.
pub struct MessageRouter {
    agent_id: String,
    routes: HashMap<String, Route>,
    free_form: Arc<dyn MessageHandler>,
    tools: Arc<ToolDispatcher>,
    default_tool: Option<String>,
    peers: Option<PeerClient>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("agent_id", &self.agent_id)
            .field("message_types", &self.message_types())
            .field("default_tool", &self.default_tool)
            .finish()
    }
}

impl MessageRouter {
    pub fn builder(agent_id: impl Into<String>, tools: Arc<ToolDispatcher>) -> MessageRouterBuilder {
        let agent_id = agent_id.into();
        MessageRouterBuilder {
            free_form: Arc::new(AckHandler::new(agent_id.clone())),
            agent_id,
            tools,
            custom: HashMap::new(),
            default_tool: None,
            peers: None,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn tools(&self) -> &Arc<ToolDispatcher> {
        &self.tools
    }

    /// Routed message types, sorted.
    pub fn message_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.routes.keys().cloned().collect();
        types.sort();
        types
    }

    /// Route one message.
    pub async fn route(&self, message: Message) -> AgentNetResult<RouteReply> {
        message.validate()?;
        debug!(
            from = %message.sender_id,
            message_type = %message.message_type,
            "Routing message"
        );

        match self.routes.get(&message.message_type) {
            None => {
                warn!(
                    from = %message.sender_id,
                    message_type = %message.message_type,
                    "Unsupported message type"
                );
                Err(AgentNetError::UnsupportedType(format!(
                    "agent '{}' does not handle message type '{}'",
                    self.agent_id, message.message_type
                )))
            }
            Some(Route::FreeForm) => Ok(RouteReply::Message(self.free_form.handle(&message).await?)),
            Some(Route::Query) => {
                let query = QueryRequest::from_content(&message.content)?;
                self.query(query).await
            }
            Some(Route::Custom(handler)) => Ok(RouteReply::Message(handler.handle(&message).await?)),
        }
    }

    /// Answer a query locally or relay it to its target.
    pub async fn query(&self, mut query: QueryRequest) -> AgentNetResult<RouteReply> {
        query.validate()?;

        if let Some(target) = query.target.take() {
            let peers = self.peers.as_ref().ok_or_else(|| {
                AgentNetError::Config(format!(
                    "agent '{}' cannot relay queries: no discovery configured",
                    self.agent_id
                ))
            })?;
            let record = peers.resolve(&target, Some(&self.agent_id)).await?;
            if record.id == self.agent_id {
                return self.answer_locally(query).await;
            }
            let response = peers.query(&record, &query).await?;
            info!(target = %record.id, "Query relayed");
            return Ok(RouteReply::Relayed {
                agent_id: record.id,
                response,
            });
        }

        self.answer_locally(query).await
    }

    async fn answer_locally(&self, query: QueryRequest) -> AgentNetResult<RouteReply> {
        if let Some(tool) = &query.tool {
            let result = self.tools.invoke(tool, &query.arguments).await?;
            return Ok(RouteReply::Tool(result));
        }

        let tool = self.default_tool.as_deref().ok_or_else(|| {
            AgentNetError::Validation(format!(
                "agent '{}' has no default tool; name a tool in the query",
                self.agent_id
            ))
        })?;
        let mut arguments = query.arguments;
        if let Some(text) = query.text {
            arguments.insert("query".to_string(), Value::String(text));
        }
        let result = self.tools.invoke(tool, &arguments).await?;
        Ok(RouteReply::Tool(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpResponse;
    use crate::testing::{client_over, json_response, MockTransport};
    use crate::tools::FnTool;
    use agentnet_registry::{DiscoveryService, RegistryStore};
    use agentnet_types::agent::AgentRegistration;
    use agentnet_types::message::QueryTarget;
    use agentnet_types::tool::{ParamSpec, ParamType, ToolDescriptor};

    fn search_tools() -> Arc<ToolDispatcher> {
        let tool = FnTool::new(
            ToolDescriptor::new("web_search", "Search")
                .for_kind("search")
                .param("query", ParamSpec::required(ParamType::String, "Query")),
            |args| async move { Ok(json!({ "results": [args["query"].clone()] })) },
        );
        Arc::new(ToolDispatcher::new().with_tool(Arc::new(tool)).unwrap())
    }

    fn router() -> MessageRouter {
        MessageRouter::builder("search-1", search_tools())
            .default_tool("web_search")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_type_is_unsupported() {
        let err = router()
            .route(Message::new("a2", "unknown_type", json!("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentNetError::UnsupportedType(_)));
        assert_eq!(err.kind(), "unsupported_type");
    }

    #[tokio::test]
    async fn test_free_form_message_is_acknowledged() {
        let reply = router()
            .route(Message::new("a2", "message", json!("hello")))
            .await
            .unwrap();
        match reply {
            RouteReply::Message(v) => {
                assert_eq!(v["status"], "received");
                assert_eq!(v["from"], "a2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_text_query_uses_default_tool() {
        let reply = router()
            .route(Message::new("a2", "query", json!("rust async")))
            .await
            .unwrap();
        match reply {
            RouteReply::Tool(result) => {
                assert!(result.is_ok());
                assert_eq!(result.data.unwrap()["results"][0], "rust async");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_text_query_without_default_tool_fails() {
        let router = MessageRouter::builder("x", search_tools()).build().unwrap();
        assert!(matches!(
            router.query(QueryRequest::text("hi")).await,
            Err(AgentNetError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_tool_query_errors() {
        let r = router();
        assert!(matches!(
            r.query(QueryRequest::tool("nope", Map::new())).await,
            Err(AgentNetError::NotFound(_))
        ));
        assert!(matches!(
            r.query(QueryRequest::tool("web_search", Map::new())).await,
            Err(AgentNetError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_tool_request_handler() {
        let tools = search_tools();
        let router = MessageRouter::builder("search-1", tools.clone())
            .handler(
                "search_request",
                Arc::new(ToolRequestHandler::new(
                    "search-1",
                    "web_search",
                    "search_response",
                    tools,
                )),
            )
            .build()
            .unwrap();

        let reply = router
            .route(Message::new("a2", "search_request", json!("tokio")))
            .await
            .unwrap();
        let RouteReply::Message(v) = reply else {
            panic!("expected message reply");
        };
        assert_eq!(v["message_type"], "search_response");
        assert_eq!(v["sender_id"], "search-1");
        assert_eq!(v["recipient_id"], "a2");
        assert_eq!(v["content"]["status"], "OK");
        assert!(router.message_types().contains(&"search_request".to_string()));
    }

    #[test]
    fn test_build_rejects_bad_tables() {
        assert!(matches!(
            MessageRouter::builder("x", search_tools())
                .default_tool("missing")
                .build(),
            Err(AgentNetError::Config(_))
        ));
        assert!(matches!(
            MessageRouter::builder("x", search_tools())
                .handler("query", Arc::new(AckHandler::new("x")))
                .build(),
            Err(AgentNetError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_query_relay_strips_target() {
        let discovery = DiscoveryService::new(RegistryStore::new());
        discovery
            .register(AgentRegistration::new("paper-1", "p", "paper", "http://paper:8002"))
            .unwrap();
        let transport = MockTransport::new(|_| {
            Ok(json_response(200, json!({"kind": "tool", "body": {"status": "OK", "data": []}})))
        });
        let router = MessageRouter::builder("search-1", search_tools())
            .peers(PeerClient::new(
                Arc::new(discovery),
                client_over(transport.clone()),
            ))
            .build()
            .unwrap();

        let query = QueryRequest::tool("paper_search", Map::new()).with_target(QueryTarget::kind("paper"));
        let reply = router
            .route(Message::new("cli", "query", serde_json::to_value(&query).unwrap()))
            .await
            .unwrap();

        match reply {
            RouteReply::Relayed { agent_id, response } => {
                assert_eq!(agent_id, "paper-1");
                assert_eq!(response["kind"], "tool");
            }
            other => panic!("unexpected {other:?}"),
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://paper:8002/query");
        let relayed = requests[0].body.as_ref().unwrap();
        assert!(relayed.get("target").is_none());
        assert_eq!(relayed["tool"], "paper_search");
    }

    #[tokio::test]
    async fn test_relay_failures_surface() {
        let discovery = DiscoveryService::new(RegistryStore::new());
        discovery
            .register(AgentRegistration::new("paper-1", "p", "paper", "http://paper:8002"))
            .unwrap();
        let transport = MockTransport::new(|_| Ok(HttpResponse::new(503, "down")));
        let router = MessageRouter::builder("search-1", search_tools())
            .peers(PeerClient::new(Arc::new(discovery), client_over(transport.clone())))
            .build()
            .unwrap();

        let to_paper = QueryRequest::text("x").with_target(QueryTarget::kind("paper"));
        assert!(matches!(
            router.query(to_paper).await,
            Err(AgentNetError::Remote { status: 503, .. })
        ));
        // Not idempotent: one attempt only.
        assert_eq!(transport.requests().len(), 1);

        let to_nobody = QueryRequest::text("x").with_target(QueryTarget::kind("chat"));
        assert!(matches!(
            router.query(to_nobody).await,
            Err(AgentNetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_relay_without_peers_is_config_error() {
        let query = QueryRequest::text("x").with_target(QueryTarget::agent("paper-1"));
        assert!(matches!(
            router().query(query).await,
            Err(AgentNetError::Config(_))
        ));
    }
}
