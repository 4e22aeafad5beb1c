//! Test doubles shared by the runtime's unit tests.

use crate::client::{
    HttpRequest, HttpResponse, Method, ResilientClient, Transport, TransportError,
};
use agentnet_registry::DiscoveryService;
use agentnet_types::agent::{AgentFilter, AgentList, AgentRegistration, AgentStatus};
use agentnet_types::config::ClientConfig;
use agentnet_types::error::AgentNetError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport answering every request from a closure and recording it.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// Client with one quick retry and no jitter.
pub(crate) fn client_over(transport: Arc<MockTransport>) -> ResilientClient {
    let config = ClientConfig {
        timeout_ms: 1_000,
        max_retries: 1,
        min_delay_ms: 1,
        max_delay_ms: 5,
        jitter: 0.0,
        ..ClientConfig::default()
    };
    ResilientClient::with_transport(&config, transport)
}

/// JSON response with the given status.
pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

fn error_response(e: &AgentNetError) -> HttpResponse {
    let status = match e {
        AgentNetError::NotFound(_) => 404,
        AgentNetError::Conflict(_) => 409,
        AgentNetError::Validation(_) => 400,
        _ => 500,
    };
    HttpResponse::new(status, serde_json::to_string(&e.to_body()).unwrap())
}

/// Transport serving the discovery HTTP API from an in-process service.
pub(crate) fn discovery_transport(service: DiscoveryService) -> Arc<MockTransport> {
    MockTransport::new(move |req| {
        let url = reqwest::Url::parse(&req.url).unwrap();
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        let response = match (req.method, segments.as_slice()) {
            (Method::Post, ["register"]) => {
                let reg: AgentRegistration =
                    serde_json::from_value(req.body.clone().unwrap()).unwrap();
                match service.register(reg) {
                    Ok(record) => json_response(201, serde_json::to_value(record).unwrap()),
                    Err(e) => error_response(&e),
                }
            }
            (Method::Put, ["heartbeat", id]) => match service.heartbeat(id) {
                Ok(()) => HttpResponse::new(204, ""),
                Err(e) => error_response(&e),
            },
            (Method::Delete, ["unregister", id]) => {
                service.unregister(id);
                HttpResponse::new(204, "")
            }
            (Method::Get, ["agent", id]) => match service.get(id) {
                Ok(record) => json_response(200, serde_json::to_value(record).unwrap()),
                Err(e) => error_response(&e),
            },
            (Method::Get, ["agents"]) => {
                let agents = service.list(&AgentFilter::any().with_statuses(&[AgentStatus::Active]));
                json_response(200, serde_json::to_value(AgentList { agents }).unwrap())
            }
            _ => HttpResponse::new(404, ""),
        };
        Ok(response)
    })
}
