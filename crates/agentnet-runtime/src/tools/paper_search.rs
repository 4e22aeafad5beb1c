//! `paper_search` tool backed by the arXiv export API.
//!
//! arXiv answers with an Atom feed; the few fields we need are pulled out
//! with plain string scanning rather than a full XML parser.

use super::{Tool, ToolError};
use crate::client::{CallOptions, HttpRequest, ResilientClient};
use agentnet_types::tool::{ParamSpec, ParamType, ToolDescriptor};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

pub const TOOL_NAME: &str = "paper_search";
pub const ARXIV_ENDPOINT: &str = "http://export.arxiv.org/api/query";

const DEFAULT_MAX_RESULTS: u64 = 5;
const MAX_RESULTS_LIMIT: u64 = 50;

/// Schema of the `paper_search` tool.
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(TOOL_NAME, "Search arXiv for academic papers")
        .for_kind("paper")
        .param(
            "query",
            ParamSpec::required(ParamType::String, "Search terms"),
        )
        .param(
            "max_results",
            ParamSpec::optional(
                ParamType::Integer,
                Some(json!(DEFAULT_MAX_RESULTS)),
                "Maximum number of papers to return",
            ),
        )
}

/// One arXiv entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub url: String,
    pub pdf_url: Option<String>,
    pub categories: Vec<String>,
    pub published: String,
}

/// arXiv paper search.
pub struct PaperSearchTool {
    descriptor: ToolDescriptor,
    client: ResilientClient,
    endpoint: String,
}

impl PaperSearchTool {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            descriptor: descriptor(),
            client,
            endpoint: ARXIV_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn query_url(&self, query: &str, max_results: u64) -> Result<String, ToolError> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| ToolError::NotConfigured(format!("bad arXiv endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:{query}"))
            .append_pair("start", "0")
            .append_pair("max_results", &max_results.to_string())
            .append_pair("sortBy", "relevance")
            .append_pair("sortOrder", "descending");
        Ok(url.to_string())
    }
}

#[async_trait]
impl Tool for PaperSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Execution("query must be a string".to_string()))?;
        let max_results = match args.get("max_results").and_then(Value::as_i64) {
            Some(n) if n < 1 => {
                return Err(ToolError::Execution(format!(
                    "max_results must be at least 1, got {n}"
                )))
            }
            Some(n) => (n as u64).min(MAX_RESULTS_LIMIT),
            None => DEFAULT_MAX_RESULTS,
        };

        debug!(query, max_results, "Searching arXiv");
        let url = self.query_url(query, max_results)?;
        let response = self
            .client
            .call(HttpRequest::get(url), &CallOptions::idempotent())
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        let papers = parse_feed(&response.body, max_results as usize);
        Ok(json!({
            "query": query,
            "count": papers.len(),
            "papers": papers,
        }))
    }
}

/// Extract entries from an arXiv Atom feed.
pub fn parse_feed(xml: &str, max: usize) -> Vec<Paper> {
    xml.split("<entry>")
        .skip(1)
        .take(max)
        .filter_map(|chunk| {
            let entry = chunk.split("</entry>").next().unwrap_or(chunk);
            let title = tag_text(entry, "title")?;
            let authors = entry
                .split("<author>")
                .skip(1)
                .filter_map(|a| tag_text(a, "name"))
                .collect();
            Some(Paper {
                title,
                authors,
                summary: tag_text(entry, "summary").unwrap_or_default(),
                url: tag_text(entry, "id").unwrap_or_default(),
                pdf_url: open_tags(entry, "link")
                    .into_iter()
                    .find(|link| attr(link, "title").as_deref() == Some("pdf"))
                    .and_then(|link| attr(link, "href")),
                categories: open_tags(entry, "category")
                    .into_iter()
                    .filter_map(|c| attr(c, "term"))
                    .collect(),
                published: tag_text(entry, "published").unwrap_or_default(),
            })
        })
        .collect()
}

/// Text of the first `<tag>...</tag>` in `s`, whitespace-collapsed.
fn tag_text(s: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let start = s.find(&open)?;
    let after_open = &s[start + open.len()..];
    let body_start = after_open.find('>')? + 1;
    let body = &after_open[body_start..];
    let end = body.find(&format!("</{tag}>"))?;
    let text = body[..end].split_whitespace().collect::<Vec<_>>().join(" ");
    Some(unescape(&text))
}

/// Attribute text of every `<tag ...>` in `s`.
fn open_tags<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag} ");
    s.split(open.as_str())
        .skip(1)
        .filter_map(|rest| rest.split('>').next())
        .collect()
}

/// Value of `name="..."` within a tag's attribute text.
fn attr(attrs: &str, name: &str) -> Option<String> {
    let haystack = format!(" {attrs}");
    let key = format!(" {name}=\"");
    let start = haystack.find(&key)? + key.len();
    let len = haystack[start..].find('"')?;
    Some(unescape(&haystack[start..start + len]))
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpResponse;
    use crate::testing::{client_over, MockTransport};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models &amp; more. </summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <published>2018-10-11T00:50:01Z</published>
    <title>BERT</title>
    <summary>Pre-training.</summary>
    <author><name>Jacob Devlin</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED, 10);
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Attention Is All You Need");
        assert_eq!(papers[0].authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(papers[0].summary, "The dominant sequence transduction models & more.");
        assert_eq!(papers[0].url, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(
            papers[0].pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/1706.03762v7")
        );
        assert_eq!(papers[0].categories, vec!["cs.CL", "cs.LG"]);
        assert_eq!(papers[1].published, "2018-10-11T00:50:01Z");
        assert_eq!(papers[1].pdf_url, None);
        assert!(papers[1].categories.is_empty());

        assert_eq!(parse_feed(FEED, 1).len(), 1);
        assert!(parse_feed("<feed></feed>", 5).is_empty());
    }

    #[tokio::test]
    async fn test_execute_builds_query_and_parses() {
        let transport = MockTransport::new(|_| Ok(HttpResponse::new(200, FEED)));
        let tool = PaperSearchTool::new(client_over(transport.clone()))
            .with_endpoint("http://arxiv.test/api/query");

        let args = descriptor()
            .validate_arguments(&json!({"query": "attention"}).as_object().cloned().unwrap())
            .unwrap();
        let out = tool.execute(args).await.unwrap();
        assert_eq!(out["count"], 2);
        assert_eq!(out["papers"][1]["title"], "BERT");
        assert_eq!(out["papers"][0]["categories"][1], "cs.LG");
        assert_eq!(out["papers"][0]["pdf_url"], "http://arxiv.org/pdf/1706.03762v7");

        let url = &transport.requests()[0].url;
        assert!(url.starts_with("http://arxiv.test/api/query?"));
        assert!(url.contains("search_query=all%3Aattention"));
        assert!(url.contains("max_results=5"));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_max_results() {
        let transport = MockTransport::new(|_| Ok(HttpResponse::new(200, FEED)));
        let tool = PaperSearchTool::new(client_over(transport.clone()));

        let mut args = Map::new();
        args.insert("query".into(), json!("x"));
        args.insert("max_results".into(), json!(0));
        assert!(matches!(
            tool.execute(args).await,
            Err(ToolError::Execution(_))
        ));
        assert!(transport.requests().is_empty());
    }
}
