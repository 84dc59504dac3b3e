//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the summarization
//! library without making real model or network calls.

use async_trait::async_trait;
use chat_client::{ChatError, ChatMessage, Role, ToolCall};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{Result, ScrapeError, ScrapeResult};
use crate::pipeline::prompts::{COMBINE_INSTRUCTION, REFINE_INSTRUCTION};
use crate::tools::StoreKind;
use crate::traits::{model::ChatModel, source::PageSource};
use crate::types::page::{PageContent, ScrapedPage};

/// How the mock answers when no scripted reply is queued.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    /// Plain text, no tool call
    Silent,

    /// Call the kind's tool with `"<tool> #<call number>"`
    Storing(StoreKind),

    /// Call the kind's tool with the conversation's system prompt
    Echoing(StoreKind),

    /// Pick the tool from the latest user instruction, text as `Storing`
    Auto,
}

enum Scripted {
    Reply(ChatMessage),
    Error(String),
}

/// A mock chat model for testing.
///
/// Scripted replies are returned first, in order; after that the model
/// falls back to its configured behavior. Every conversation it receives
/// is recorded.
pub struct MockChatModel {
    fallback: Fallback,

    /// Replies to hand out before falling back
    scripted: Arc<RwLock<VecDeque<Scripted>>>,

    /// Conversations received, in call order
    calls: Arc<RwLock<Vec<Vec<ChatMessage>>>>,
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatModel {
    /// Answer only with scripted replies; plain text afterwards.
    pub fn new() -> Self {
        Self::with_fallback(Fallback::Silent)
    }

    /// Always store `"<tool> #<call number>"` through `kind`'s tool.
    pub fn storing(kind: StoreKind) -> Self {
        Self::with_fallback(Fallback::Storing(kind))
    }

    /// Always store the system prompt through `kind`'s tool.
    pub fn echoing(kind: StoreKind) -> Self {
        Self::with_fallback(Fallback::Echoing(kind))
    }

    /// Store through whichever tool the latest instruction asks for.
    pub fn auto() -> Self {
        Self::with_fallback(Fallback::Auto)
    }

    fn with_fallback(fallback: Fallback) -> Self {
        Self {
            fallback,
            scripted: Arc::new(RwLock::new(VecDeque::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a reply.
    pub fn push_response(&self, reply: ChatMessage) {
        self.scripted
            .write()
            .unwrap()
            .push_back(Scripted::Reply(reply));
    }

    /// Queue a reply that stores `text` through `kind`'s tool.
    pub fn push_store(&self, kind: StoreKind, text: impl Into<String>) {
        let n = self.scripted.read().unwrap().len() + self.calls.read().unwrap().len() + 1;
        self.push_response(store_reply(kind, n, text.into()));
    }

    /// Queue a model failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.scripted
            .write()
            .unwrap()
            .push_back(Scripted::Error(message.into()));
    }

    /// Get all conversations sent to this mock.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn fallback_reply(&self, messages: &[ChatMessage], n: usize) -> ChatMessage {
        match self.fallback {
            Fallback::Silent => ChatMessage::assistant("No scripted response"),
            Fallback::Storing(kind) => store_reply(kind, n, numbered(kind, n)),
            Fallback::Echoing(kind) => {
                let prompt = messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .map(|m| m.text().to_string())
                    .unwrap_or_default();
                store_reply(kind, n, prompt)
            }
            Fallback::Auto => {
                let kind = instructed_kind(messages);
                store_reply(kind, n, numbered(kind, n))
            }
        }
    }
}

fn numbered(kind: StoreKind, n: usize) -> String {
    format!("{} #{}", kind.tool_name(), n)
}

fn store_reply(kind: StoreKind, n: usize, text: String) -> ChatMessage {
    let mut arguments = serde_json::Map::new();
    arguments.insert(kind.text_field().to_string(), serde_json::Value::String(text));

    ChatMessage::assistant_with_tool_calls(
        None,
        vec![ToolCall::new(
            format!("call_{}", n),
            kind.tool_name(),
            serde_json::Value::Object(arguments),
        )],
    )
}

/// Store kind named by the most recent user turn.
fn instructed_kind(messages: &[ChatMessage]) -> StoreKind {
    let instruction = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(ChatMessage::text)
        .unwrap_or_default();

    if instruction == COMBINE_INSTRUCTION || instruction.contains("combined") {
        StoreKind::Combined
    } else if instruction == REFINE_INSTRUCTION || instruction.contains("refined") {
        StoreKind::Refinement
    } else {
        StoreKind::Conversion
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let n = {
            let mut calls = self.calls.write().unwrap();
            calls.push(messages.to_vec());
            calls.len()
        };

        let scripted = self.scripted.write().unwrap().pop_front();
        match scripted {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Error(message)) => Err(ChatError::Network(message).into()),
            None => Ok(self.fallback_reply(messages, n)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock page source that serves predefined content.
#[derive(Default)]
pub struct MockPageSource {
    /// Content by URL
    pages: Arc<RwLock<HashMap<String, PageContent>>>,

    /// URLs requested, in order
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `url`.
    pub fn with_page(self, url: impl Into<String>, content: PageContent) -> Self {
        self.add_page(url, content);
        self
    }

    pub fn add_page(&self, url: impl Into<String>, content: PageContent) {
        self.pages.write().unwrap().insert(url.into(), content);
    }

    /// Get all URLs requested from this source.
    pub fn requests(&self) -> Vec<String> {
        self.requests.read().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch_page(&self, url: &str) -> ScrapeResult<ScrapedPage> {
        self.requests.write().unwrap().push(url.to_string());

        match self.pages.read().unwrap().get(url) {
            Some(content) => Ok(ScrapedPage::new(url, content.clone())),
            None => Err(ScrapeError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummaryError;
    use crate::pipeline::prompts::CONVERT_INSTRUCTION;
    use crate::types::page::Fragment;

    #[tokio::test]
    async fn test_scripted_replies_come_first() {
        let model = MockChatModel::storing(StoreKind::Conversion);
        model.push_response(ChatMessage::assistant("scripted"));
        model.push_error("boom");

        let first = model.invoke(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(first.text(), "scripted");

        let second = model.invoke(&[ChatMessage::user("b")]).await.unwrap_err();
        assert!(matches!(second, SummaryError::Model(ChatError::Network(_))));

        let third = model.invoke(&[ChatMessage::user("c")]).await.unwrap();
        let call = third.last_tool_call().unwrap();
        assert_eq!(call.arguments["markdown_text"], "StoreConvertedPage #3");

        assert_eq!(model.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_auto_follows_instruction() {
        let model = MockChatModel::auto();

        let reply = model
            .invoke(&[ChatMessage::user(CONVERT_INSTRUCTION)])
            .await
            .unwrap();
        assert_eq!(reply.last_tool_call().unwrap().name, "StoreConvertedPage");

        let reply = model
            .invoke(&[ChatMessage::user("Please review the refined text and store it.")])
            .await
            .unwrap();
        assert_eq!(reply.last_tool_call().unwrap().name, "StoreRefinedPageSummary");

        let reply = model
            .invoke(&[ChatMessage::user(COMBINE_INSTRUCTION)])
            .await
            .unwrap();
        assert_eq!(reply.last_tool_call().unwrap().name, "StoreCombinedPageSummary");
    }

    #[tokio::test]
    async fn test_mock_page_source() {
        let mut content = PageContent::new();
        content.insert("H".into(), vec![Fragment::P("p".into())]);
        let source = MockPageSource::new().with_page("https://a", content.clone());

        let page = source.fetch_page("https://a").await.unwrap();
        assert_eq!(page.content, content);

        let err = source.fetch_page("https://b").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));

        assert_eq!(source.requests(), vec!["https://a", "https://b"]);
    }
}
