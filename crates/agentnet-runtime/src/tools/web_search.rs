//! `web_search` tool backed by the Serper Google Search API.

use super::{Tool, ToolError};
use crate::client::{CallOptions, HttpRequest, ResilientClient};
use agentnet_types::tool::{ParamSpec, ParamType, ToolDescriptor};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

pub const TOOL_NAME: &str = "web_search";
pub const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
/// Environment variable holding the Serper API key.
pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";

/// Schema of the `web_search` tool.
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        TOOL_NAME,
        "Search the web for up-to-date information on a topic",
    )
    .for_kind("search")
    .param(
        "query",
        ParamSpec::required(ParamType::String, "The search query"),
    )
}

/// Web search through Serper.
pub struct WebSearchTool {
    descriptor: ToolDescriptor,
    client: ResilientClient,
    api_key: Option<String>,
    endpoint: String,
}

impl WebSearchTool {
    /// Tool reading its API key from `SERPER_API_KEY`.
    pub fn new(client: ResilientClient) -> Self {
        let api_key = std::env::var(SERPER_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self {
            descriptor: descriptor(),
            client,
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::NotConfigured(format!("{SERPER_API_KEY_ENV} is not set")))?;
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Execution("query must be a string".to_string()))?;

        debug!(query, "Searching via Serper");
        let request = HttpRequest::post(&self.endpoint, json!({ "q": query }))
            .header("X-API-KEY", api_key);
        let body: Value = self
            .client
            .call_json(request, &CallOptions::idempotent())
            .await?;

        Ok(summarize_results(query, &body))
    }
}

/// Reduce a Serper response to the answer box and organic hits.
pub fn summarize_results(query: &str, body: &Value) -> Value {
    let results: Vec<Value> = body["organic"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    json!({
                        "title": item["title"].as_str().unwrap_or(""),
                        "link": item["link"].as_str().unwrap_or(""),
                        "snippet": item["snippet"].as_str().unwrap_or(""),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let answer = body["answerBox"]["answer"]
        .as_str()
        .or_else(|| body["answerBox"]["snippet"].as_str())
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null);

    json!({
        "query": query,
        "answer": answer,
        "results": results,
    })
}
