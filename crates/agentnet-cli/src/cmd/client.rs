//! One-shot commands against a running network.

use crate::{table, ui};
use agentnet_runtime::{DiscoveryClient, PeerClient, ResilientClient};
use agentnet_types::agent::{AgentFilter, AgentStatus};
use agentnet_types::config::NetConfig;
use agentnet_types::error::AgentNetResult;
use agentnet_types::message::{Message, QueryRequest, QueryTarget};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Sender id stamped on messages sent from the command line.
pub const CLI_SENDER_ID: &str = "agentnet-cli";

fn discovery(config: &NetConfig, url: Option<String>) -> AgentNetResult<DiscoveryClient> {
    let url = url.unwrap_or_else(|| config.agent.discovery_url.clone());
    DiscoveryClient::new(&url, ResilientClient::new(&config.client))
}

fn peers(config: &NetConfig, url: Option<String>) -> AgentNetResult<PeerClient> {
    let discovery = discovery(config, url)?;
    Ok(PeerClient::new(
        Arc::new(discovery),
        ResilientClient::new(&config.client),
    ))
}

pub async fn list_agents(
    config: &NetConfig,
    url: Option<String>,
    filter: AgentFilter,
) -> AgentNetResult<()> {
    let agents = discovery(config, url)?.list(&filter).await?;
    if agents.is_empty() {
        ui::hint("No agents registered.");
        return Ok(());
    }
    println!("{}", table::render(&agents, chrono::Utc::now()));
    Ok(())
}

/// `--kind`, `--capability` and `--include-stale` as a filter.
pub fn agents_filter(
    kind: Option<String>,
    capability: Option<String>,
    include_stale: bool,
) -> AgentFilter {
    let statuses: &[AgentStatus] = if include_stale {
        &[AgentStatus::Active, AgentStatus::Stale]
    } else {
        &[AgentStatus::Active]
    };
    AgentFilter {
        kind,
        capability,
        ..AgentFilter::default()
    }
    .with_statuses(statuses)
}

pub async fn agent_info(config: &NetConfig, url: Option<String>, id: &str) -> AgentNetResult<()> {
    let record = discovery(config, url)?.get(id).await?;
    ui::json(&serde_json::to_value(&record)?);
    Ok(())
}

/// Message content: JSON when it parses, plain text otherwise.
pub fn parse_content(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn send(
    config: &NetConfig,
    url: Option<String>,
    id: &str,
    message_type: &str,
    content: &str,
) -> AgentNetResult<()> {
    let message = Message::new(CLI_SENDER_ID, message_type, parse_content(content)).to(id);
    let reply = peers(config, url)?.send_message(id, &message).await?;
    ui::json(&reply);
    Ok(())
}

/// Build the query and the target that answers it.
///
/// With a tool but no agent or kind, the first agent advertising the tool
/// is asked.
pub fn build_query(
    agent: Option<String>,
    kind: Option<String>,
    tool: Option<String>,
    text: String,
) -> (QueryTarget, QueryRequest) {
    let mut target = QueryTarget {
        agent_id: agent,
        kind,
        capability: None,
    };
    let query = match tool {
        Some(tool) => {
            if target.agent_id.is_none() && target.kind.is_none() {
                target.capability = Some(tool.clone());
            }
            let mut arguments = Map::new();
            arguments.insert("query".to_string(), Value::String(text));
            QueryRequest::tool(tool, arguments)
        }
        None => QueryRequest::text(text),
    };
    (target, query)
}

pub async fn query(
    config: &NetConfig,
    url: Option<String>,
    target: QueryTarget,
    query: QueryRequest,
) -> AgentNetResult<()> {
    query.validate()?;
    let peers = peers(config, url)?;
    let record = peers.resolve(&target, None).await?;
    let reply = peers.query(&record, &query).await?;
    ui::kv("Answered by", &record.id);
    ui::json(&reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_parses_json_or_falls_back_to_text() {
        assert_eq!(parse_content(r#"{"query": "rust"}"#)["query"], "rust");
        assert_eq!(parse_content("hello there"), Value::String("hello there".into()));
        assert_eq!(parse_content("42"), Value::from(42));
    }

    #[test]
    fn test_tool_query_targets_capability() {
        let (target, query) = build_query(None, None, Some("paper_search".into()), "llm".into());
        assert_eq!(target.capability.as_deref(), Some("paper_search"));
        assert_eq!(query.tool.as_deref(), Some("paper_search"));
        assert_eq!(query.arguments["query"], "llm");

        let (target, query) = build_query(Some("search-1".into()), None, None, "rust".into());
        assert_eq!(target, QueryTarget::agent("search-1"));
        assert_eq!(query.text.as_deref(), Some("rust"));
    }

    #[test]
    fn test_stale_agents_only_on_request() {
        assert_eq!(agents_filter(None, None, false).statuses, vec![AgentStatus::Active]);
        let filter = agents_filter(Some("paper".into()), None, true);
        assert_eq!(filter.statuses.len(), 2);
        assert_eq!(filter.kind.as_deref(), Some("paper"));
    }
}
