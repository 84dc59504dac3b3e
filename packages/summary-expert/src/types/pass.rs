//! Summarization pass types - the result of one model exchange.

use chat_client::ChatMessage;
use serde::{Deserialize, Serialize};

/// Text produced by a pass, plus the conversation that produced it.
///
/// The turns end with the model's tool call and the tool acknowledgement,
/// so a following quality-check pass can continue the same conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizationPass {
    /// Page the text came from; `None` for combined summaries
    pub url: Option<String>,

    pub text: String,

    #[serde(default)]
    pub turns: Vec<ChatMessage>,
}

impl SummarizationPass {
    /// A pass that has not been sent to a model yet.
    pub fn new(url: Option<String>, text: impl Into<String>) -> Self {
        Self {
            url,
            text: text.into(),
            turns: Vec::new(),
        }
    }

    /// Same text and url with the conversation cleared.
    pub fn fresh(&self) -> Self {
        Self::new(self.url.clone(), self.text.clone())
    }
}

/// Passes for each section of a page, in section order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizationPassBatch {
    pub sections: Vec<SummarizationPass>,
}

impl SummarizationPassBatch {
    pub fn texts(&self) -> Vec<String> {
        self.sections.iter().map(|pass| pass.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
