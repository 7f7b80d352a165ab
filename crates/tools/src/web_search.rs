//! Web search tool backed by the Google Custom Search JSON API.
//!
//! Credentials come from the request config (`google_api_key`, `google_cx`)
//! or the process environment (`GOOGLE_API_KEY`, `GOOGLE_CX`). The result is a
//! JSON-encoded list of result snippets; search outages degrade to `[]` so the
//! model can still answer from what it knows.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};
use voxloop_core::context::RequestContext;
use voxloop_core::error::ToolError;
use voxloop_core::tool::{Tool, parse_arguments, schema_for};

pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebSearchArgs {
    /// The search query
    pub query: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    snippet: Option<String>,
}

pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_SEARCH_URL)
    }

    /// Point the tool at a different search endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Run the search. Never fails: any transport or API problem is logged
    /// and reported as no results.
    async fn search(&self, query: &str, api_key: &str, cx: &str) -> Vec<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", api_key), ("cx", cx), ("q", query)])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Web search request failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Web search returned an error status");
            return Vec::new();
        }

        match response.json::<SearchResponse>().await {
            Ok(body) => body.items.into_iter().filter_map(|i| i.snippet).collect(),
            Err(e) => {
                warn!(error = %e, "Web search returned an unreadable body");
                Vec::new()
            }
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a given query using Google Custom Search"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<WebSearchArgs>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<String, ToolError> {
        let args: WebSearchArgs = parse_arguments(self.name(), arguments)?;

        let cx = ctx
            .setting("google_cx")
            .ok_or_else(|| ToolError::MissingCredential {
                tool_name: self.name().to_string(),
                setting: "google_cx".into(),
            })?;
        let api_key = ctx.setting("google_api_key").unwrap_or_default();

        debug!(query = %args.query, "Running web search");
        let snippets = self.search(&args.query, api_key, cx).await;

        serde_json::to_string(&snippets).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use voxloop_core::context::{ProcessDefaults, RequestOverrides, UserInput};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx_with(settings: &[(&str, &str)]) -> RequestContext {
        let defaults = ProcessDefaults {
            settings: settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..Default::default()
        };
        RequestContext::new("c1", UserInput::text("hi"), "today", Arc::new(defaults))
    }

    #[test]
    fn schema_requires_query() {
        let schema = WebSearchTool::new().parameters_schema();
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"][0], "query");
    }

    #[tokio::test]
    async fn returns_snippets_as_json_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "capital of France"))
            .and(query_param("key", "gkey"))
            .and(query_param("cx", "engine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"title": "Paris", "snippet": "Paris is the capital of France."},
                    {"title": "No snippet"},
                    {"title": "France", "snippet": "France is in Europe."}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = WebSearchTool::with_base_url(server.uri());
        let ctx = ctx_with(&[("google_api_key", "gkey"), ("google_cx", "engine")]);
        let out = tool
            .execute(serde_json::json!({"query": "capital of France"}), &ctx)
            .await
            .unwrap();

        let snippets: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(
            snippets,
            vec!["Paris is the capital of France.", "France is in Europe."]
        );
    }

    #[tokio::test]
    async fn request_config_overrides_process_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cx", "request-engine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut extra = BTreeMap::new();
        extra.insert("google_cx".to_string(), serde_json::json!("request-engine"));
        let ctx = ctx_with(&[("google_cx", "process-engine")]).with_overrides(RequestOverrides {
            extra,
            ..Default::default()
        });

        let out = WebSearchTool::with_base_url(server.uri())
            .execute(serde_json::json!({"query": "anything"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn error_status_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let out = WebSearchTool::with_base_url(server.uri())
            .execute(serde_json::json!({"query": "x"}), &ctx_with(&[("google_cx", "e")]))
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn transport_failure_yields_empty_list() {
        let tool = WebSearchTool::with_base_url("http://127.0.0.1:1/customsearch/v1");
        let out = tool
            .execute(serde_json::json!({"query": "x"}), &ctx_with(&[("google_cx", "e")]))
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn missing_engine_id_is_an_error() {
        let err = WebSearchTool::new()
            .execute(serde_json::json!({"query": "x"}), &ctx_with(&[("google_api_key", "k")]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::MissingCredential { setting, .. } if setting == "google_cx"
        ));
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let err = WebSearchTool::new()
            .execute(serde_json::json!({}), &ctx_with(&[("google_cx", "e")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
