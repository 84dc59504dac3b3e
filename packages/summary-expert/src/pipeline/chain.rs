//! Summarization passes: one model exchange per pass.
//!
//! Each pass sends a conversation to a model with one store tool bound,
//! records the model's tool call and answers it, so the returned turns can
//! seed a quality-control pass over the same conversation.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use chat_client::{ChatClient, ChatMessage};

use crate::ai::{ModelSettings, ToolBoundModel};
use crate::error::{Result, SummaryError};
use crate::pipeline::prompts::{
    format_combine_prompt, format_page_refine_prompt, format_page_to_markdown_prompt,
    review_turns, ReviewStage, COMBINE_INSTRUCTION, CONVERT_INSTRUCTION, REFINE_INSTRUCTION,
};
use crate::tools::StoreKind;
use crate::traits::model::ChatModel;
use crate::types::page::ScrapedPage;
use crate::types::pass::{SummarizationPass, SummarizationPassBatch};

/// Sections sent to the model at once in batched passes.
pub const BATCH_SIZE: usize = 3;

/// The three models used by the passes, each with its store tool bound.
#[derive(Clone)]
pub struct SummaryChain {
    convert: Arc<dyn ChatModel>,
    refine: Arc<dyn ChatModel>,
    combine: Arc<dyn ChatModel>,
}

impl SummaryChain {
    pub fn new(
        convert: Arc<dyn ChatModel>,
        refine: Arc<dyn ChatModel>,
        combine: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            convert,
            refine,
            combine,
        }
    }

    /// Bind each store tool to its own copy of `client`.
    pub fn from_client(client: &ChatClient, settings: &ModelSettings) -> Self {
        let bound = |kind: StoreKind| -> Arc<dyn ChatModel> {
            Arc::new(ToolBoundModel::new(client.clone(), settings.clone()).bind_tools(kind.tools()))
        };
        Self::new(
            bound(StoreKind::Conversion),
            bound(StoreKind::Refinement),
            bound(StoreKind::Combined),
        )
    }

    pub fn convert_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.convert)
    }

    pub fn refine_model(&self) -> Arc<dyn ChatModel> {
        Arc::clone(&self.refine)
    }

    /// Convert `pass.text` (structured page JSON) to markdown.
    pub async fn perform_initial_conversion(
        &self,
        pass: SummarizationPass,
    ) -> Result<SummarizationPass> {
        let mut turns = pass.turns;
        turns.push(ChatMessage::system(format_page_to_markdown_prompt(&pass.text)));
        turns.push(ChatMessage::user(CONVERT_INSTRUCTION));

        run_pass(self.convert.as_ref(), StoreKind::Conversion, pass.url, turns).await
    }

    /// Have the model review its conversion and store it again.
    pub async fn perform_conversion_qc(&self, pass: SummarizationPass) -> Result<SummarizationPass> {
        let turns = with_review(pass.turns, ReviewStage::Conversion, &pass.text);
        run_pass(self.convert.as_ref(), StoreKind::Conversion, pass.url, turns).await
    }

    /// Restructure `pass.text` (markdown) for readability.
    pub async fn perform_initial_refinement(
        &self,
        pass: SummarizationPass,
    ) -> Result<SummarizationPass> {
        let mut turns = pass.turns;
        turns.push(ChatMessage::system(format_page_refine_prompt(&pass.text)));
        turns.push(ChatMessage::user(REFINE_INSTRUCTION));

        run_pass(self.refine.as_ref(), StoreKind::Refinement, pass.url, turns).await
    }

    /// Have the model review its refinement and store it again.
    pub async fn perform_refinement_qc(&self, pass: SummarizationPass) -> Result<SummarizationPass> {
        let turns = with_review(pass.turns, ReviewStage::Refinement, &pass.text);
        run_pass(self.refine.as_ref(), StoreKind::Refinement, pass.url, turns).await
    }

    /// Merge page summaries; `pass.text` is a JSON array of summaries.
    pub async fn perform_combined_summary(
        &self,
        pass: SummarizationPass,
    ) -> Result<SummarizationPass> {
        let mut turns = pass.turns;
        turns.push(ChatMessage::system(format_combine_prompt(&pass.text)));
        turns.push(ChatMessage::user(COMBINE_INSTRUCTION));

        run_pass(self.combine.as_ref(), StoreKind::Combined, pass.url, turns).await
    }

    /// Convert each section of `page` separately.
    pub async fn perform_initial_conversion_batched(
        &self,
        page: &ScrapedPage,
    ) -> Result<SummarizationPassBatch> {
        let contexts = page
            .section_texts()?
            .into_iter()
            .map(|section| {
                vec![
                    ChatMessage::system(format_page_to_markdown_prompt(&section)),
                    ChatMessage::user(CONVERT_INSTRUCTION),
                ]
            })
            .collect();

        info!(url = %page.url, sections = page.section_count(), "Converting page by section");
        self.run_batch(self.convert.as_ref(), StoreKind::Conversion, &page.url, contexts)
            .await
    }

    /// Refine each converted section separately.
    pub async fn perform_initial_refinement_batch(
        &self,
        url: &str,
        sections: &[String],
    ) -> Result<SummarizationPassBatch> {
        let contexts = sections
            .iter()
            .map(|section| {
                vec![
                    ChatMessage::system(format_page_refine_prompt(section)),
                    ChatMessage::user(REFINE_INSTRUCTION),
                ]
            })
            .collect();

        info!(url = %url, sections = sections.len(), "Refining page by section");
        self.run_batch(self.refine.as_ref(), StoreKind::Refinement, url, contexts)
            .await
    }

    async fn run_batch(
        &self,
        model: &dyn ChatModel,
        kind: StoreKind,
        url: &str,
        contexts: Vec<Vec<ChatMessage>>,
    ) -> Result<SummarizationPassBatch> {
        let mut sections = Vec::with_capacity(contexts.len());

        for (index, group) in contexts.chunks(BATCH_SIZE).enumerate() {
            debug!(group = index, size = group.len(), tool = kind.tool_name(), "Running batch group");
            let results = join_all(
                group
                    .iter()
                    .map(|turns| run_pass(model, kind, Some(url.to_string()), turns.clone())),
            )
            .await;

            for result in results {
                sections.push(result?);
            }
        }

        Ok(SummarizationPassBatch { sections })
    }
}

fn with_review(mut turns: Vec<ChatMessage>, stage: ReviewStage, text: &str) -> Vec<ChatMessage> {
    turns.extend(review_turns(stage, text));
    turns
}

/// Invoke `model` on `turns` and store the text from its last tool call.
pub async fn run_pass(
    model: &dyn ChatModel,
    kind: StoreKind,
    url: Option<String>,
    mut turns: Vec<ChatMessage>,
) -> Result<SummarizationPass> {
    let response = model.invoke(&turns).await?;
    let call = response
        .last_tool_call()
        .cloned()
        .ok_or_else(|| SummaryError::MissingToolCall {
            tool: kind.tool_name().to_string(),
        })?;

    turns.push(response);
    let text = kind.store(&call).await?;
    turns.push(kind.tool_message(&call));

    Ok(SummarizationPass { url, text, turns })
}
