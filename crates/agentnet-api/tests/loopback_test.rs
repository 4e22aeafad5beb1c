//! Discovery plus two agents on loopback sockets, talking over real HTTP.

use agentnet_api::server::local_addr;
use agentnet_api::{agent_router, bind, discovery_router, serve_on};
use agentnet_registry::{DiscoveryService, RegistryStore};
use agentnet_runtime::tools::FnTool;
use agentnet_runtime::{
    AgentNode, DiscoveryClient, MessageRouter, PeerClient, ResilientClient, Supervisor,
    ToolDispatcher, ToolError,
};
use agentnet_types::agent::{AgentFilter, AgentRegistration, AgentStatus};
use agentnet_types::config::ClientConfig;
use agentnet_types::message::{QueryRequest, QueryTarget, RouteReply};
use agentnet_types::tool::{ParamSpec, ParamType, ToolDescriptor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn client() -> ResilientClient {
    ResilientClient::new(&ClientConfig {
        timeout_ms: 2_000,
        max_retries: 1,
        min_delay_ms: 10,
        max_delay_ms: 50,
        jitter: 0.0,
        ..ClientConfig::default()
    })
}

fn echo_tools(name: &'static str, kind: &'static str) -> Arc<ToolDispatcher> {
    let tool = FnTool::new(
        ToolDescriptor::new(name, "Echo the query")
            .for_kind(kind)
            .param("query", ParamSpec::required(ParamType::String, "Query")),
        move |args| async move {
            Ok::<_, ToolError>(json!({ "answered_by": name, "query": args["query"].clone() }))
        },
    );
    Arc::new(ToolDispatcher::new().with_tool(Arc::new(tool)).unwrap())
}

/// Bind an agent server, register it and start heartbeating.
async fn spawn_agent(
    supervisor: &Supervisor,
    discovery_url: &str,
    id: &str,
    kind: &'static str,
    tool: &'static str,
) -> (AgentNode, Arc<MessageRouter>) {
    let listener = bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", local_addr(&listener).unwrap());

    let discovery = DiscoveryClient::new(discovery_url, client()).unwrap();
    let peers = PeerClient::new(Arc::new(discovery.clone()), client());
    let router = Arc::new(
        MessageRouter::builder(id, echo_tools(tool, kind))
            .default_tool(tool)
            .peers(peers)
            .build()
            .unwrap(),
    );
    tokio::spawn(serve_on(
        listener,
        agent_router(router.clone()),
        supervisor.subscribe(),
    ));

    let registration = AgentRegistration::new(id, id, kind, endpoint).with_capability(tool);
    let node = AgentNode::new(registration, discovery, Duration::from_millis(25));
    node.start().await.unwrap();
    (node, router)
}

#[tokio::test]
async fn test_query_is_relayed_between_agents() {
    let supervisor = Supervisor::new();
    let service = DiscoveryService::new(RegistryStore::new());

    let listener = bind("127.0.0.1:0").await.unwrap();
    let discovery_url = format!("http://{}", local_addr(&listener).unwrap());
    let server = tokio::spawn(serve_on(
        listener,
        discovery_router(service.clone()),
        supervisor.subscribe(),
    ));

    let (search_node, search_router) =
        spawn_agent(&supervisor, &discovery_url, "search-1", "search", "web_search").await;
    let (paper_node, _) =
        spawn_agent(&supervisor, &discovery_url, "paper-1", "paper", "paper_search").await;

    let active = service.list(&AgentFilter::active());
    assert_eq!(active.len(), 2);

    let query = QueryRequest::text("graph neural networks").with_target(QueryTarget::kind("paper"));
    match search_router.query(query).await.unwrap() {
        RouteReply::Relayed { agent_id, response } => {
            assert_eq!(agent_id, "paper-1");
            assert_eq!(response["kind"], "tool");
            assert_eq!(response["body"]["data"]["answered_by"], "paper_search");
            assert_eq!(response["body"]["data"]["query"], "graph neural networks");
        }
        other => panic!("expected relayed reply, got {other:?}"),
    }

    // Heartbeats keep both agents ACTIVE across several intervals.
    tokio::time::sleep(Duration::from_millis(120)).await;
    let record = service.get("paper-1").unwrap();
    assert_eq!(record.status, AgentStatus::Active);

    paper_node.shutdown().await;
    assert!(service.get("paper-1").is_err());

    let orphan = QueryRequest::text("anything").with_target(QueryTarget::kind("paper"));
    let err = search_router.query(orphan).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");

    search_node.shutdown().await;
    supervisor.shutdown();
    server.await.unwrap().unwrap();
    assert!(service.list(&AgentFilter::any()).is_empty());
}
