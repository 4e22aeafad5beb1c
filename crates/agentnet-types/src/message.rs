//! Messages exchanged between agents.

use crate::error::{AgentNetError, AgentNetResult};
use crate::tool::ToolResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message type routed to the free-form handler.
pub const MESSAGE_TYPE_MESSAGE: &str = "message";
/// Message type parsed as a [`QueryRequest`].
pub const MESSAGE_TYPE_QUERY: &str = "query";

/// An inbound or outbound agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Agent that sent the message.
    pub sender_id: String,
    /// Intended recipient, when not implied by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Free-form text or structured payload.
    pub content: serde_json::Value,
    /// Routing tag.
    pub message_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    /// Create a message with no recipient or metadata.
    pub fn new(
        sender_id: impl Into<String>,
        message_type: impl Into<String>,
        content: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: None,
            content: content.into(),
            message_type: message_type.into(),
            metadata: HashMap::new(),
        }
    }

    /// Address the message to a specific agent.
    pub fn to(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    /// Reject structurally malformed messages.
    pub fn validate(&self) -> AgentNetResult<()> {
        if self.message_type.trim().is_empty() {
            return Err(AgentNetError::Validation(
                "message_type must not be empty".to_string(),
            ));
        }
        if self.sender_id.trim().is_empty() {
            return Err(AgentNetError::Validation(
                "sender_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a query should be relayed.
///
/// `agent_id` wins when set; otherwise the first ACTIVE agent matching
/// `kind` and `capability` is chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
}

impl QueryTarget {
    /// Target a specific agent.
    pub fn agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    /// Target any agent of a kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.agent_id.is_none() && self.kind.is_none() && self.capability.is_none()
    }
}

/// Structured form of a "query" message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Free-text query, handed to the default tool when no tool is named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool to invoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Raw tool arguments.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// Relay target. Absent means "handle locally".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<QueryTarget>,
    /// Caller declares the query safe to retry when relayed.
    #[serde(default)]
    pub idempotent: bool,
}

impl QueryRequest {
    /// A plain-text query.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A tool invocation.
    pub fn tool(
        tool: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            tool: Some(tool.into()),
            arguments,
            ..Self::default()
        }
    }

    /// Relay this query to another agent.
    pub fn with_target(mut self, target: QueryTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Parse message content. A bare string is shorthand for `{"text": ...}`.
    pub fn from_content(content: &serde_json::Value) -> AgentNetResult<Self> {
        let request = match content {
            serde_json::Value::String(text) => Self::text(text.clone()),
            serde_json::Value::Object(_) => serde_json::from_value::<Self>(content.clone())
                .map_err(|e| AgentNetError::Validation(format!("malformed query: {e}")))?,
            other => {
                return Err(AgentNetError::Validation(format!(
                    "query content must be a string or object, got {}",
                    json_type_name(other)
                )))
            }
        };
        request.validate()?;
        Ok(request)
    }

    /// A query must say what to do: a tool or some text.
    pub fn validate(&self) -> AgentNetResult<()> {
        if self.tool.is_none() && self.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(AgentNetError::Validation(
                "query names neither a tool nor any text".to_string(),
            ));
        }
        if let Some(target) = &self.target {
            if target.is_empty() {
                return Err(AgentNetError::Validation(
                    "query target names no agent, kind or capability".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// What an agent sends back for a routed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum RouteReply {
    /// Output of a free-form or custom message handler.
    Message(serde_json::Value),
    /// Result of a local tool invocation.
    Tool(ToolResult),
    /// Reply of the peer a query was relayed to.
    Relayed {
        agent_id: String,
        response: serde_json::Value,
    },
}

/// JSON type name for error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
