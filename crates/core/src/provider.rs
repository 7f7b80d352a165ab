//! Provider trait: the abstraction over the language-model completion API.
//!
//! A Provider sends a system message, the transcript, and the tool
//! declarations to a model and returns one completion. It never retries and
//! never caches: transport errors go straight back to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};

/// Where to send a completion request and how to authenticate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// API base URL, e.g. `https://api.groq.com/openai/v1/`
    pub base_url: String,

    /// Bearer credential (may be empty for local servers)
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "None" } else { "[REDACTED]" })
            .finish()
    }
}

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub endpoint: Endpoint,

    /// The model to use (e.g., "llama3-70b-8192")
    pub model: String,

    /// System message first, then the transcript
    pub messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") | None => FinishReason::Stop,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message
    pub message: Message,

    pub finish_reason: FinishReason,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// What the loop should do with a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// The model is done; this is the final answer.
    Final(String),
    /// The model wants these tools run before it continues (never empty).
    ToolCalls(Vec<MessageToolCall>),
}

impl ProviderResponse {
    /// Classify the response. Pending tool calls always win over the finish
    /// reason, so a response is never treated as final while calls are open.
    pub fn outcome(&self) -> ModelOutcome {
        if self.message.tool_calls.is_empty() {
            ModelOutcome::Final(self.message.content.clone())
        } else {
            ModelOutcome::ToolCalls(self.message.tool_calls.clone())
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The orchestration loop calls `complete()` without knowing which backend
/// answers it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(message: Message, raw_finish: Option<&str>) -> ProviderResponse {
        ProviderResponse {
            message,
            finish_reason: FinishReason::parse(raw_finish),
            usage: None,
            model: "m".into(),
        }
    }

    #[test]
    fn finish_reason_parsing() {
        assert_eq!(FinishReason::parse(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::parse(Some("tool_calls")), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse(Some("length")), FinishReason::Length);
        assert_eq!(
            FinishReason::parse(Some("content_filter")),
            FinishReason::Other("content_filter".into())
        );
    }

    #[test]
    fn text_response_is_final() {
        let resp = response(Message::assistant("Paris."), Some("stop"));
        assert_eq!(resp.outcome(), ModelOutcome::Final("Paris.".into()));
    }

    #[test]
    fn tool_calls_take_precedence_over_stop() {
        let calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "web_search".into(),
            arguments: "{}".into(),
        }];
        let resp = response(Message::assistant_tool_calls("", calls.clone()), Some("stop"));
        assert_eq!(resp.outcome(), ModelOutcome::ToolCalls(calls));
    }

    #[test]
    fn endpoint_debug_redacts_key() {
        let ep = Endpoint {
            base_url: "https://example.test/v1".into(),
            api_key: "sk-secret".into(),
        };
        let dbg = format!("{ep:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
