//! Built-in tool implementations for voxloop.
//!
//! Tools give the assistant a way to look things up while it answers.
//! Today that is a single web search backed by Google Custom Search.

pub mod web_search;

use std::sync::Arc;

use voxloop_core::tool::ToolRegistry;

pub use web_search::WebSearchTool;

/// Create the registry served by the gateway and the CLI.
pub fn default_registry() -> ToolRegistry {
    ToolRegistry::new().with(Arc::new(WebSearchTool::new()))
}
