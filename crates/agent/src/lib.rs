//! The tool-calling orchestration loop.
//!
//! One turn follows a **Call → Act → Observe** cycle:
//!
//! 1. **Resolve** model settings from request, process and built-in layers
//! 2. **Record** the user message (unless the turn carries images)
//! 3. **Call** the model with the system message, transcript and tools
//! 4. **If tool calls**: record them, run each tool, record the results, loop
//! 5. **If text**: record the answer and return it
//!
//! The loop stops at the first text answer, or fails once the round budget
//! is spent.

pub mod arguments;
pub mod locks;
pub mod loop_runner;

pub use locks::TurnLocks;
pub use loop_runner::AgentLoop;
