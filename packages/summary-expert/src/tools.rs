//! Store tools bound to the summarization models.
//!
//! The tools do nothing but hand back their argument. Binding one to a
//! model makes the model deliver its output through the tool's schema,
//! so every pass yields exactly one well-formed text field.

use async_trait::async_trait;
use chat_client::{ChatMessage, Tool, ToolCall, ToolDefinition};
use schemars::JsonSchema;
use serde::Deserialize;
use std::convert::Infallible;

use crate::error::{Result, SummaryError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StoreConvertedPageArgs {
    /// The human-readable, markdown text of the page
    pub markdown_text: String,
}

/// Stores the page once converted from structured text to markdown.
pub struct StoreConvertedPage;

#[async_trait]
impl Tool for StoreConvertedPage {
    const NAME: &'static str = "StoreConvertedPage";
    type Args = StoreConvertedPageArgs;
    type Output = String;
    type Error = Infallible;

    fn description(&self) -> &str {
        "Stores the web page content once it has been converted from structured text to markdown"
    }

    async fn call(&self, args: Self::Args) -> std::result::Result<String, Infallible> {
        Ok(args.markdown_text)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StoreRefinedPageSummaryArgs {
    /// The refined, summarized text of the page
    pub refined_text: String,
}

/// Stores the page once refined.
pub struct StoreRefinedPageSummary;

#[async_trait]
impl Tool for StoreRefinedPageSummary {
    const NAME: &'static str = "StoreRefinedPageSummary";
    type Args = StoreRefinedPageSummaryArgs;
    type Output = String;
    type Error = Infallible;

    fn description(&self) -> &str {
        "Stores the web page content once it has been refined to ensure it adheres to the summary guidelines"
    }

    async fn call(&self, args: Self::Args) -> std::result::Result<String, Infallible> {
        Ok(args.refined_text)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StoreCombinedPageSummaryArgs {
    /// The combined, summarized text of the pages
    pub combined_text: String,
}

/// Stores the summary combined from several pages.
pub struct StoreCombinedPageSummary;

#[async_trait]
impl Tool for StoreCombinedPageSummary {
    const NAME: &'static str = "StoreCombinedPageSummary";
    type Args = StoreCombinedPageSummaryArgs;
    type Output = String;
    type Error = Infallible;

    fn description(&self) -> &str {
        "Stores the combined, summarized web page content"
    }

    async fn call(&self, args: Self::Args) -> std::result::Result<String, Infallible> {
        Ok(args.combined_text)
    }
}

/// The tool set bound for a kind of pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Conversion,
    Refinement,
    Combined,
}

impl StoreKind {
    pub fn tool_name(&self) -> &'static str {
        match self {
            StoreKind::Conversion => StoreConvertedPage::NAME,
            StoreKind::Refinement => StoreRefinedPageSummary::NAME,
            StoreKind::Combined => StoreCombinedPageSummary::NAME,
        }
    }

    /// Argument field that carries the stored text.
    pub fn text_field(&self) -> &'static str {
        match self {
            StoreKind::Conversion => "markdown_text",
            StoreKind::Refinement => "refined_text",
            StoreKind::Combined => "combined_text",
        }
    }

    /// Content of the tool turn that answers a store call.
    pub fn acknowledgement(&self) -> &'static str {
        match self {
            StoreKind::Conversion => "Stored the converted text",
            StoreKind::Refinement => "Stored the refined text",
            StoreKind::Combined => "Stored the combined text",
        }
    }

    /// Definitions to bind to the model for this kind of pass.
    pub fn tools(&self) -> Vec<ToolDefinition> {
        let definition = match self {
            StoreKind::Conversion => StoreConvertedPage.definition(),
            StoreKind::Refinement => StoreRefinedPageSummary.definition(),
            StoreKind::Combined => StoreCombinedPageSummary.definition(),
        };
        vec![definition]
    }

    /// Run the store tool named by `call` and return the stored text.
    pub async fn store(&self, call: &ToolCall) -> Result<String> {
        if call.name != self.tool_name() {
            return Err(SummaryError::UnexpectedToolCall {
                expected: self.tool_name().to_string(),
                actual: call.name.clone(),
            });
        }

        let text = match self {
            StoreKind::Conversion => StoreConvertedPage.call(self.parse(call)?).await,
            StoreKind::Refinement => StoreRefinedPageSummary.call(self.parse(call)?).await,
            StoreKind::Combined => StoreCombinedPageSummary.call(self.parse(call)?).await,
        };
        // Infallible
        Ok(text.unwrap_or_else(|never| match never {}))
    }

    /// Tool turn acknowledging `call`.
    pub fn tool_message(&self, call: &ToolCall) -> ChatMessage {
        ChatMessage::tool(self.tool_name(), call.id.clone(), self.acknowledgement())
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, call: &ToolCall) -> Result<T> {
        call.parse_args().map_err(|e| SummaryError::ToolArguments {
            tool: self.tool_name().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_client::Role;
    use serde_json::json;

    #[test]
    fn test_tool_definitions() {
        let tools = StoreKind::Conversion.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "StoreConvertedPage");
        assert_eq!(
            tools[0].parameters["properties"]["markdown_text"]["description"],
            "The human-readable, markdown text of the page"
        );
        assert_eq!(tools[0].parameters["required"], json!(["markdown_text"]));

        assert_eq!(
            StoreKind::Refinement.tools()[0].name,
            "StoreRefinedPageSummary"
        );
        assert_eq!(
            StoreKind::Combined.tools()[0].name,
            "StoreCombinedPageSummary"
        );
    }

    #[tokio::test]
    async fn test_store_returns_argument() {
        let call = ToolCall::new(
            "call_1",
            "StoreRefinedPageSummary",
            json!({"refined_text": "# Refined"}),
        );

        let text = StoreKind::Refinement.store(&call).await.unwrap();
        assert_eq!(text, "# Refined");
    }

    #[tokio::test]
    async fn test_store_rejects_other_tool() {
        let call = ToolCall::new("call_1", "StoreConvertedPage", json!({"markdown_text": "x"}));

        let err = StoreKind::Refinement.store(&call).await.unwrap_err();
        assert!(matches!(
            err,
            SummaryError::UnexpectedToolCall { ref expected, ref actual }
                if expected == "StoreRefinedPageSummary" && actual == "StoreConvertedPage"
        ));
    }

    #[tokio::test]
    async fn test_store_rejects_bad_arguments() {
        let call = ToolCall::new("call_1", "StoreCombinedPageSummary", json!({"text": "x"}));

        let err = StoreKind::Combined.store(&call).await.unwrap_err();
        assert!(matches!(err, SummaryError::ToolArguments { .. }));
    }

    #[test]
    fn test_tool_message() {
        let call = ToolCall::new("call_9", "StoreConvertedPage", json!({}));
        let message = StoreKind::Conversion.tool_message(&call);

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(message.name.as_deref(), Some("StoreConvertedPage"));
        assert_eq!(message.text(), "Stored the converted text");
    }
}
