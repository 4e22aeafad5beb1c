//! Resilient outbound HTTP client.
//!
//! Every outbound call an agent makes (discovery traffic, relayed queries,
//! tool backends) goes through [`ResilientClient`], which adds a per-attempt
//! timeout, retries transient failures with backoff, and refuses to retry
//! calls that are not marked idempotent.

use crate::retry::{retry_async, GiveUp, RetryConfig, RetryOutcome, RetryState};
use agentnet_types::config::ClientConfig;
use agentnet_types::error::AgentNetError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// HTTP method subset used by AgentNet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, url).json(body)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response as seen by the retry logic.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `retry-after` header, in seconds.
    pub retry_after_secs: Option<u64>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after_secs: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AgentNetError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| {
            AgentNetError::Serialization(format!("invalid response body: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single transport exchange.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Connection(String),
}

/// Failure of a resilient call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("remote returned {status}: {body}")]
    Remote {
        status: u16,
        body: String,
        retry_after_secs: Option<u64>,
    },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ClientError> },
}

impl ClientError {
    /// Server-suggested delay in milliseconds.
    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ClientError::Remote {
                retry_after_secs: Some(secs),
                ..
            } => Some(secs.saturating_mul(1_000)),
            _ => None,
        }
    }
}

impl From<ClientError> for AgentNetError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Timeout { after_ms } => AgentNetError::Timeout(after_ms),
            ClientError::Connection(msg) => AgentNetError::Connection(msg),
            ClientError::Remote { status, body, .. } => AgentNetError::from_remote(status, &body),
            ClientError::RetriesExhausted { attempts, last } => AgentNetError::RetriesExhausted {
                attempts,
                last: last.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One HTTP exchange, without retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agentnet/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Connection(format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            status,
            body,
            retry_after_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Resilient client
// ---------------------------------------------------------------------------

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Safe to retry. Non-idempotent calls get exactly one attempt.
    pub idempotent: bool,
    /// Per-attempt timeout; the client default applies when `None`.
    pub timeout: Option<Duration>,
    /// Budget for the whole call, retries included.
    pub deadline: Option<Duration>,
}

impl CallOptions {
    pub fn idempotent() -> Self {
        Self {
            idempotent: true,
            ..Self::default()
        }
    }

    pub fn once() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Outbound client with timeout, retry and backoff.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    default_timeout: Duration,
    retry_server_errors: bool,
    retryable_statuses: Vec<u16>,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("retry", &self.retry)
            .field("default_timeout", &self.default_timeout)
            .field("retry_server_errors", &self.retry_server_errors)
            .field("retryable_statuses", &self.retryable_statuses)
            .finish()
    }
}

impl ResilientClient {
    /// Client over the `reqwest` transport.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Client over a caller-supplied transport.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: RetryConfig::from(config),
            default_timeout: Duration::from_millis(config.timeout_ms.max(1)),
            retry_server_errors: config.retry_server_errors,
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Whether a failure is worth another attempt.
    pub fn is_transient(&self, error: &ClientError) -> bool {
        match error {
            ClientError::Timeout { .. } | ClientError::Connection(_) => true,
            ClientError::Remote { status, .. } => {
                (self.retry_server_errors && (500..600).contains(status))
                    || self.retryable_statuses.contains(status)
            }
            ClientError::RetriesExhausted { .. } => false,
        }
    }

    /// Perform a call. Returns the first 2xx response.
    pub async fn call(
        &self,
        request: HttpRequest,
        options: &CallOptions,
    ) -> Result<HttpResponse, ClientError> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let config = if options.idempotent {
            self.retry.clone()
        } else {
            self.retry.single_attempt()
        };
        let may_retry = config.max_retries > 0;

        let mut state = RetryState::new(config);
        if let Some(budget) = options.deadline {
            state = state.with_deadline(Instant::now() + budget);
        }

        let request = &request;
        let outcome = retry_async(
            state,
            |attempt| async move {
                debug!(method = %request.method, url = %request.url, attempt, "Outbound call");
                self.attempt(request, timeout).await
            },
            |e| self.is_transient(e),
            ClientError::retry_after_ms,
        )
        .await;

        match outcome {
            RetryOutcome::Success { result, .. } => Ok(result),
            RetryOutcome::Failed {
                last_error,
                attempts,
                reason,
            } => match reason {
                GiveUp::Exhausted | GiveUp::DeadlineReached if may_retry => {
                    Err(ClientError::RetriesExhausted {
                        attempts,
                        last: Box::new(last_error),
                    })
                }
                _ => Err(last_error),
            },
        }
    }

    /// Perform a call and decode the JSON response.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        options: &CallOptions,
    ) -> Result<T, AgentNetError> {
        let response = self.call(request, options).await?;
        response.json()
    }

    async fn attempt(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, ClientError> {
        let after_ms = timeout.as_millis() as u64;
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => Err(ClientError::Timeout { after_ms }),
            Ok(Err(TransportError::Connection(msg))) => Err(ClientError::Connection(msg)),
            Ok(Ok(resp)) if resp.is_success() => Ok(resp),
            Ok(Ok(resp)) => Err(ClientError::Remote {
                status: resp.status,
                body: resp.body,
                retry_after_secs: resp.retry_after_secs,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
