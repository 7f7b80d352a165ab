//! The orchestration loop implementation.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};
use voxloop_config::AgentConfig;
use voxloop_config::resolve::resolve;
use voxloop_core::context::{RequestContext, UserInput};
use voxloop_core::error::{Error, ProviderError, ToolError};
use voxloop_core::history::HistoryStore;
use voxloop_core::message::{ConversationId, ImageAttachment, Message, MessageToolCall};
use voxloop_core::provider::{ModelOutcome, Provider, ProviderRequest, ProviderResponse};
use voxloop_core::tool::ToolRegistry;

use crate::arguments::{decode_arguments, is_double_encoding_model};
use crate::locks::TurnLocks;

/// Build the system message text for one turn.
pub fn compose_system_prompt(prompt: &str, date: &str) -> String {
    format!("{prompt}\n\nUser's current info:\ndate: {date}")
}

/// Check the new input and decode-validate any images.
fn validate_input(ctx: &RequestContext) -> Result<Vec<ImageAttachment>, Error> {
    if ctx.conversation_id.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("chat_id must not be empty".into()));
    }
    let UserInput { text, images } = &ctx.input;
    if text.trim().is_empty() && images.is_empty() {
        return Err(Error::InvalidInput(
            "input is required when no images are supplied".into(),
        ));
    }
    images
        .iter()
        .enumerate()
        .map(|(i, data)| {
            STANDARD
                .decode(data.trim())
                .map_err(|e| Error::InvalidInput(format!("image {i} is not valid base64: {e}")))?;
            Ok(ImageAttachment::jpeg(data.trim()))
        })
        .collect()
}

/// The messages of one turn, and whether they reach the history store.
///
/// Text turns start from the stored transcript and persist every message as
/// it is produced. Image turns start from the one-off multi-part message and
/// persist nothing.
struct Turn<'a> {
    history: &'a dyn HistoryStore,
    id: &'a ConversationId,
    persist: bool,
    messages: Vec<Message>,
}

impl Turn<'_> {
    async fn record(&mut self, message: Message) -> Result<(), Error> {
        if self.persist {
            self.history.append(self.id, message.clone()).await?;
        }
        self.messages.push(message);
        Ok(())
    }
}

/// The orchestration loop: model calls, tool dispatch and history writes.
pub struct AgentLoop {
    /// The completion client
    provider: Arc<dyn Provider>,

    /// Tools the model may call
    tools: Arc<ToolRegistry>,

    /// Conversation transcripts
    history: Arc<dyn HistoryStore>,

    /// Maximum model calls per turn
    max_rounds: u32,

    model_timeout: Duration,
    tool_timeout: Duration,

    /// Model-name patterns whose tool arguments arrive double-encoded
    double_encoded_models: Vec<String>,

    turn_locks: TurnLocks,
}

impl AgentLoop {
    /// Create a new loop with default limits.
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            provider,
            tools,
            history,
            max_rounds: 0,
            model_timeout: Duration::ZERO,
            tool_timeout: Duration::ZERO,
            double_encoded_models: Vec::new(),
            turn_locks: TurnLocks::new(),
        }
        .with_limits(&AgentConfig::default())
    }

    /// Apply every limit from the `[agent]` config section.
    pub fn with_limits(self, config: &AgentConfig) -> Self {
        self.with_max_rounds(config.max_rounds)
            .with_model_timeout(Duration::from_secs(config.model_timeout_secs))
            .with_tool_timeout(Duration::from_secs(config.tool_timeout_secs))
            .with_double_encoded_models(config.double_encoded_argument_models.clone())
    }

    /// Set the maximum number of model calls per turn.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_double_encoded_models(mut self, patterns: Vec<String>) -> Self {
        self.double_encoded_models = patterns;
        self
    }

    /// Run one conversational turn and return the assistant's final text.
    ///
    /// Every message of a text turn is appended to history as it is produced,
    /// so a failure part-way leaves the transcript up to the failing step.
    ///
    /// A failed or timed-out tool leaves an assistant message whose tool calls
    /// have no results. OpenAI-compatible APIs reject a transcript like that,
    /// so every later turn on the same conversation id fails at the model
    /// call. Callers recover by starting a new conversation id.
    pub async fn run(&self, ctx: &RequestContext) -> Result<String, Error> {
        let images = validate_input(ctx)?;
        let _turn_guard = self.turn_locks.acquire(&ctx.conversation_id).await;

        let resolved = resolve(&ctx.overrides, &ctx.defaults);
        let system = Message::system(compose_system_prompt(&resolved.system_prompt, &ctx.date));
        let unwrap_arguments = is_double_encoding_model(&resolved.model, &self.double_encoded_models);

        info!(
            conversation_id = %ctx.conversation_id,
            model = %resolved.model,
            images = images.len(),
            "Processing turn"
        );

        let mut turn = if images.is_empty() {
            let stored = self.history.get(&ctx.conversation_id).await?;
            let mut turn = Turn {
                history: self.history.as_ref(),
                id: &ctx.conversation_id,
                persist: true,
                messages: stored,
            };
            turn.record(Message::user(ctx.input.text.clone())).await?;
            turn
        } else {
            Turn {
                history: self.history.as_ref(),
                id: &ctx.conversation_id,
                persist: false,
                messages: vec![Message::user_with_images(ctx.input.text.clone(), images)],
            }
        };

        let declarations = self.tools.declarations();

        for round in 1..=self.max_rounds {
            debug!(conversation_id = %ctx.conversation_id, round, "Loop round");

            let mut messages = Vec::with_capacity(turn.messages.len() + 1);
            messages.push(system.clone());
            messages.extend(turn.messages.iter().cloned());

            let request = ProviderRequest {
                endpoint: resolved.endpoint.clone(),
                model: resolved.model.clone(),
                messages,
                tools: declarations.clone(),
            };

            let response = self.call_model(request).await?;
            if let Some(usage) = &response.usage {
                debug!(
                    conversation_id = %ctx.conversation_id,
                    model = %response.model,
                    tokens = usage.total_tokens,
                    "Model responded"
                );
            }

            match response.outcome() {
                ModelOutcome::Final(text) => {
                    turn.record(Message::assistant(text.clone())).await?;
                    info!(conversation_id = %ctx.conversation_id, rounds = round, "Turn complete");
                    return Ok(text);
                }
                ModelOutcome::ToolCalls(calls) => {
                    debug!(tool_count = calls.len(), "Executing tool calls");
                    turn.record(Message::assistant_tool_calls(
                        response.message.content.clone(),
                        calls.clone(),
                    ))
                    .await?;

                    for call in &calls {
                        let output = self.run_tool(call, unwrap_arguments, ctx).await?;
                        turn.record(Message::tool_result(call.id.clone(), output)).await?;
                    }
                }
            }
        }

        warn!(
            conversation_id = %ctx.conversation_id,
            rounds = self.max_rounds,
            "Tool-call budget exhausted"
        );
        Err(Error::ToolBudgetExceeded {
            rounds: self.max_rounds,
        })
    }

    async fn call_model(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.model_timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_secs: self.model_timeout.as_secs(),
            }),
        }
    }

    async fn run_tool(
        &self,
        call: &MessageToolCall,
        unwrap_arguments: bool,
        ctx: &RequestContext,
    ) -> Result<String, ToolError> {
        // Unknown names fail before the arguments are looked at.
        let tool = self.tools.require(&call.name)?;
        let arguments = decode_arguments(&call.name, &call.arguments, unwrap_arguments)?;

        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool");
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.tool_timeout, tool.execute(arguments, ctx)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                debug!(tool = %call.name, duration_ms, "Tool finished");
                Ok(output)
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                Err(e)
            }
            Err(_) => {
                warn!(tool = %call.name, duration_ms, "Tool timed out");
                Err(ToolError::Timeout {
                    tool_name: call.name.clone(),
                    timeout_secs: self.tool_timeout.as_secs(),
                })
            }
        }
    }
}
