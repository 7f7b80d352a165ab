//! # voxloop Core
//!
//! Domain types, traits, and error definitions for the voxloop conversational
//! agent. This crate has **no framework dependencies**: it defines the domain
//! model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each collaborator of the orchestration loop is a trait here:
//! - [`Provider`] for the language-model completion API
//! - [`HistoryStore`] for the per-conversation append log
//! - [`Tool`] for executors registered in the [`ToolRegistry`]
//!
//! Implementations live in their own crates, so tests can swap in doubles.

pub mod context;
pub mod error;
pub mod history;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ProcessDefaults, RequestContext, RequestOverrides, UserInput};
pub use error::{Error, HistoryError, ProviderError, Result, ToolError};
pub use history::HistoryStore;
pub use message::{ConversationId, ImageAttachment, Message, MessageToolCall, Role};
pub use provider::{
    Endpoint, FinishReason, ModelOutcome, Provider, ProviderRequest, ProviderResponse,
    ToolDefinition, Usage,
};
pub use tool::{Tool, ToolRegistry};
