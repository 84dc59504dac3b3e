//! Chat-completions implementation of the `ChatModel` trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use summary_expert::ai::{ModelSettings, ToolBoundModel};
//! use summary_expert::StoreKind;
//!
//! let client = chat_client::ChatClient::from_env()?;
//! let convert = ToolBoundModel::new(client, ModelSettings::default())
//!     .bind_tools(StoreKind::Conversion.tools());
//! ```

use async_trait::async_trait;
use chat_client::{ChatClient, ChatMessage, ChatRequest, ToolChoice, ToolDefinition};
use tracing::debug;

use crate::error::Result;
use crate::traits::model::ChatModel;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Sampling settings shared by every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ModelSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A chat client with tools bound to every request.
///
/// With exactly one tool bound, requests force a call to that tool.
#[derive(Debug, Clone)]
pub struct ToolBoundModel {
    client: ChatClient,
    settings: ModelSettings,
    tools: Vec<ToolDefinition>,
}

impl ToolBoundModel {
    pub fn new(client: ChatClient, settings: ModelSettings) -> Self {
        Self {
            client,
            settings,
            tools: Vec::new(),
        }
    }

    /// Bind tool definitions sent with every request.
    pub fn bind_tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Request for `messages` with the bound tools and settings.
    pub fn build_request(&self, messages: &[ChatMessage]) -> ChatRequest {
        let mut request = ChatRequest::new(&self.settings.model)
            .messages(messages.iter().cloned())
            .tools(self.tools.iter().cloned())
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        if let [only] = self.tools.as_slice() {
            request = request.tool_choice(ToolChoice::Function(only.name.clone()));
        } else if !self.tools.is_empty() {
            request = request.tool_choice(ToolChoice::Auto);
        }

        request
    }
}

#[async_trait]
impl ChatModel for ToolBoundModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let request = self.build_request(messages);
        let response = self.client.complete(&request).await?;

        debug!(
            model = %self.settings.model,
            finish_reason = ?response.finish_reason,
            tool_calls = response.message.tool_calls.len(),
            "Model responded"
        );

        Ok(response.message)
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}
