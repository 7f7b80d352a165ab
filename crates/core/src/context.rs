//! Per-request context handed to the loop and to every tool executor.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::message::ConversationId;

/// Configuration overrides supplied with a single request.
///
/// The well-known options are typed fields; anything else (tool credentials
/// such as `google_cx` or `search1api_key`) lands in `extra`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RequestOverrides {
    /// A non-empty string option from `extra`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl std::fmt::Debug for RequestOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOverrides")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "[SET]"))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide values, resolved once at startup from the config file and the
/// environment snapshot. `None` means "fall back to the compiled-in default".
#[derive(Clone, Default)]
pub struct ProcessDefaults {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,

    /// Tool settings and credentials keyed by their request option name.
    pub settings: BTreeMap<String, String>,
}

impl std::fmt::Debug for ProcessDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDefaults")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "[SET]"))
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The new user input for a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub text: String,

    /// Base64-encoded image bytes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }
}

/// Everything one orchestration run knows about its request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conversation_id: ConversationId,
    pub input: UserInput,

    /// Caller-supplied date/time, passed verbatim into the system prompt
    pub date: String,

    pub overrides: RequestOverrides,
    pub defaults: Arc<ProcessDefaults>,
}

impl RequestContext {
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        input: UserInput,
        date: impl Into<String>,
        defaults: Arc<ProcessDefaults>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            input,
            date: date.into(),
            overrides: RequestOverrides::default(),
            defaults,
        }
    }

    pub fn with_overrides(mut self, overrides: RequestOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Look up a tool setting: request override first, then process default.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.overrides.extra_str(key).or_else(|| {
            self.defaults
                .settings
                .get(key)
                .map(String::as_str)
                .filter(|s| !s.is_empty())
        })
    }
}
