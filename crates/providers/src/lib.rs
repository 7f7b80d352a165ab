//! Language-model provider implementations for voxloop.
//!
//! All providers implement the `voxloop_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
