//! Model implementations for the summarization passes.
//!
//! Provides a chat-completions backed implementation of the `ChatModel`
//! trait. Users can use it directly or implement their own.

mod bound;

pub use bound::{ModelSettings, ToolBoundModel, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
