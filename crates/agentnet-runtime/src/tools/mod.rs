//! Tool dispatch.
//!
//! A [`ToolDispatcher`] is a read-only table of named tools built once at
//! agent startup. Invoking a tool looks it up, validates and coerces its
//! arguments against the tool's descriptor, executes it, and wraps whatever
//! happens (including a panic) in a [`ToolResult`].

pub mod paper_search;
pub mod web_search;

use crate::client::ResilientClient;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use agentnet_types::tool::{ToolDescriptor, ToolResult};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

pub use paper_search::PaperSearchTool;
pub use web_search::WebSearchTool;

/// Failure raised by a tool body.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The tool ran and failed.
    #[error("{0}")]
    Execution(String),
    /// An upstream service the tool depends on failed.
    #[error("backend error: {0}")]
    Backend(String),
    /// The tool is missing configuration (API key, endpoint).
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl ToolError {
    /// Tag stored in the failed [`ToolResult`].
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Execution(_) => "execution_error",
            ToolError::Backend(_) => "backend_error",
            ToolError::NotConfigured(_) => "not_configured",
        }
    }
}

impl From<AgentNetError> for ToolError {
    fn from(e: AgentNetError) -> Self {
        ToolError::Backend(e.to_string())
    }
}

/// A named operation an agent can execute.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Check and normalize raw arguments.
    fn validate(&self, raw: &Map<String, Value>) -> AgentNetResult<Map<String, Value>> {
        self.descriptor().validate_arguments(raw)
    }

    /// Run the tool on validated arguments.
    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError>;
}

/// A [`Tool`] backed by an async closure.
pub struct FnTool<F> {
    descriptor: ToolDescriptor,
    body: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    pub fn new(descriptor: ToolDescriptor, body: F) -> Self {
        Self { descriptor, body }
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        (self.body)(args).await
    }
}

/// Name → tool table.
#[derive(Default)]
pub struct ToolDispatcher {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    panics: AtomicU64,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names are unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> AgentNetResult<()> {
        let name = tool.descriptor().name.clone();
        if name.trim().is_empty() {
            return Err(AgentNetError::Validation("tool name must not be empty".to_string()));
        }
        if self.tools.contains_key(&name) {
            return Err(AgentNetError::Conflict(format!(
                "tool '{name}' is already registered"
            )));
        }
        debug!(tool = %name, "Tool registered");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> AgentNetResult<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, advertised as agent capabilities.
    pub fn names(&self) -> BTreeSet<String> {
        self.tools.keys().cloned().collect()
    }

    /// Descriptors of every tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor().clone()).collect()
    }

    /// Descriptors of the tools meant for agents of `kind`.
    pub fn tools_for_kind(&self, kind: &str) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| t.descriptor())
            .filter(|d| d.agent_kind == kind)
            .cloned()
            .collect()
    }

    /// Human-readable description of one tool.
    pub fn describe(&self, name: &str) -> Option<String> {
        self.tools.get(name).map(|t| t.descriptor().describe())
    }

    /// Panics caught since startup.
    pub fn panic_count(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    /// Look up, validate and run a tool.
    ///
    /// Unknown tools are `NotFound` and bad arguments are `Validation`,
    /// both before the tool body runs. Anything the body does, including
    /// panicking, ends up in the returned [`ToolResult`].
    pub async fn invoke(&self, name: &str, raw: &Map<String, Value>) -> AgentNetResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentNetError::NotFound(format!("unknown tool '{name}'")))?;
        let args = tool.validate(raw)?;

        debug!(tool = %name, "Executing tool");
        let result = match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(Ok(output)) => ToolResult::from_output(output),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool failed");
                ToolResult::error(e.kind(), e.to_string())
            }
            Err(payload) => {
                self.panics.fetch_add(1, Ordering::Relaxed);
                let message = panic_message(payload.as_ref());
                error!(tool = %name, panic = %message, "Tool panicked");
                ToolResult::error("panic", format!("tool '{name}' panicked: {message}"))
            }
        };
        Ok(result)
    }
}

/// The bundled tools for an agent kind: `web_search` for `search`,
/// `paper_search` for `paper`, nothing otherwise.
pub fn builtin_tools(kind: &str, client: &ResilientClient) -> Vec<Arc<dyn Tool>> {
    match kind {
        "search" => vec![Arc::new(WebSearchTool::new(client.clone()))],
        "paper" => vec![Arc::new(PaperSearchTool::new(client.clone()))],
        _ => Vec::new(),
    }
}

/// A dispatcher holding the bundled tools for `kind`.
pub fn builtin_dispatcher(kind: &str, client: &ResilientClient) -> AgentNetResult<ToolDispatcher> {
    let mut dispatcher = ToolDispatcher::new();
    for tool in builtin_tools(kind, client) {
        dispatcher.register(tool)?;
    }
    Ok(dispatcher)
}

/// How an agent of a bundled kind wires its tool into the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinProfile {
    /// Default tool for text queries.
    pub tool: &'static str,
    /// Typed request message answered with `tool`.
    pub request_type: &'static str,
    pub response_type: &'static str,
}

pub fn builtin_profile(kind: &str) -> Option<BuiltinProfile> {
    match kind {
        "search" => Some(BuiltinProfile {
            tool: web_search::TOOL_NAME,
            request_type: "search_request",
            response_type: "search_response",
        }),
        "paper" => Some(BuiltinProfile {
            tool: paper_search::TOOL_NAME,
            request_type: "paper_search_request",
            response_type: "paper_search_response",
        }),
        _ => None,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
