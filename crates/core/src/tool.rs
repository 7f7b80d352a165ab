//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the model reach outside the conversation, for example
//! to search the web. Each tool declares a JSON Schema for its parameters and
//! receives the full [`RequestContext`] so it can read per-request credentials.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::context::RequestContext;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. The returned text becomes the tool message content.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// JSON Schema for a typed argument struct, minus the `$schema`/`title`
/// noise that completion APIs don't want.
pub fn schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

/// Deserialize raw arguments into a tool's typed parameter struct.
pub fn parse_arguments<T: DeserializeOwned>(
    tool_name: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool_name}: {e}")))
}

/// A registry of available tools.
///
/// Built once at startup and shared read-only. The loop uses it to:
/// 1. Get tool definitions to send to the model (in registration order)
/// 2. Look up and execute tools when the model requests them
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name,
    /// keeping its original position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&pos| &self.tools[pos])
    }

    /// Fail with `UnknownTool` unless `name` is registered.
    pub fn require(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// All tool definitions, in registration order.
    pub fn declarations(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute the named tool.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<String, ToolError> {
        self.require(name)?.execute(arguments, ctx).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ProcessDefaults, UserInput};
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        /// Text to echo back
        text: String,
    }

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            schema_for::<EchoArgs>()
        }
        async fn execute(&self, arguments: serde_json::Value, _ctx: &RequestContext) -> Result<String, ToolError> {
            let args: EchoArgs = parse_arguments(self.name(), arguments)?;
            Ok(args.text)
        }
    }

    struct ConversationTool;

    #[async_trait]
    impl Tool for ConversationTool {
        fn name(&self) -> &str { "whoami" }
        fn description(&self) -> &str { "Reports the conversation id" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: serde_json::Value, ctx: &RequestContext) -> Result<String, ToolError> {
            Ok(ctx.conversation_id.to_string())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("conv-1", UserInput::text("hi"), "2026-01-01", Arc::new(ProcessDefaults::default()))
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = ToolRegistry::new().with(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn declarations_keep_registration_order() {
        let registry = ToolRegistry::new()
            .with(Arc::new(EchoTool))
            .with(Arc::new(ConversationTool))
            .with(Arc::new(EchoTool));
        assert_eq!(registry.names(), vec!["echo", "whoami"]);
        let defs = registry.declarations();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "whoami");
    }

    #[test]
    fn generated_schema_describes_fields() {
        let schema = schema_for::<EchoArgs>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"][0], "text");
        assert!(schema.get("$schema").is_none());
    }

    #[tokio::test]
    async fn dispatch_runs_tool_with_context() {
        let registry = ToolRegistry::new()
            .with(Arc::new(EchoTool))
            .with(Arc::new(ConversationTool));

        let out = registry
            .dispatch("echo", serde_json::json!({"text": "hello world"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out, "hello world");

        let out = registry.dispatch("whoami", serde_json::json!({}), &ctx()).await.unwrap();
        assert_eq!(out, "conv-1");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .dispatch("fly_to_moon", serde_json::json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "fly_to_moon"));
    }

    #[tokio::test]
    async fn dispatch_rejects_mistyped_arguments() {
        let registry = ToolRegistry::new().with(Arc::new(EchoTool));
        let err = registry
            .dispatch("echo", serde_json::json!({"text": 7}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
