//! Chat model trait.
//!
//! Every summarization pass sends a conversation to a model that has one
//! store tool bound and expects the reply to call that tool. Implement this
//! trait to plug in a provider; [`crate::ai::ToolBoundModel`] wraps the
//! chat-completions client and [`crate::testing::MockChatModel`] scripts
//! replies for tests.

use async_trait::async_trait;
use chat_client::ChatMessage;

use crate::error::Result;

/// A model that answers a conversation with one assistant turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant's reply.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatMessage>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "model"
    }
}
