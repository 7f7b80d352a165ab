//! Layered resolution of model settings for one request.
//!
//! Every tunable resolves as: request override, else process-wide value
//! (config file + environment snapshot), else the compiled-in default.

use voxloop_core::{Endpoint, ProcessDefaults, RequestOverrides};

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a voice assistant. Answer in 1-2 sentences. \
Be friendly, helpful and concise. Default to metric units when possible. \
Keep the conversation short and sweet. You only answer in text. \
Don't include links or any other extras. \
Don't respond with computer code, for example don't return user longitude.";

/// The effective model settings for one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModelConfig {
    pub endpoint: Endpoint,
    pub model: String,
    pub system_prompt: String,
}

fn pick(layers: [Option<&str>; 2], fallback: &str) -> String {
    layers
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Resolve the model settings for a request.
pub fn resolve(overrides: &RequestOverrides, defaults: &ProcessDefaults) -> ResolvedModelConfig {
    let base_url = pick(
        [overrides.api_base.as_deref(), defaults.api_base.as_deref()],
        DEFAULT_API_BASE,
    );
    let api_key = pick(
        [overrides.api_key.as_deref(), defaults.api_key.as_deref()],
        "",
    );
    ResolvedModelConfig {
        endpoint: Endpoint { base_url, api_key },
        model: pick(
            [overrides.model.as_deref(), defaults.model.as_deref()],
            DEFAULT_MODEL,
        ),
        system_prompt: pick(
            [
                overrides.system_prompt.as_deref(),
                defaults.system_prompt.as_deref(),
            ],
            DEFAULT_SYSTEM_PROMPT,
        ),
    }
}
