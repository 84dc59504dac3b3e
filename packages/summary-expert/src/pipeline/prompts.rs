//! Prompt templates and fixed conversation turns.
//!
//! Templates use `{source_text}` placeholders filled by the `format_*`
//! helpers.

use chat_client::ChatMessage;

use crate::types::page::escape_non_ascii;

/// System prompt for turning a page's structured content into markdown.
pub const PAGE_TO_MARKDOWN_PROMPT: &str = r#"
You are an AI assistant whose goal is to assist in creating detailed summaries of web pages.  You will
be provided with a structured representation of the content of a web page (listed below as source_text),
and your task is to generate a human-readable, markdown representation of the content.

While working towards the goal of creating the markdown representation, you will ALWAYS follow the below
general guidelines:
<guidelines>
- Do not attempt to be friendly in your responses.  Be as direct and succinct as possible.
- Think through the problem, extract all data from the task and the previous conversations before creating any plan.
- Never assume any parameter values while invoking a tool or function.
- You may not ask clarifying questions; if you need more information, indicate that in your output and stop.
</guidelines>

Additionally, you must ALWAYS follow these conversion_guidelines for the summaries you produce:
<conversion_guidelines>
- You will try to retain as much of the original detail as possible
- You will try to retain the exact wording and structure of the source_text
- You will not add any information that is not present in the source_text
- You MUST produce output in a human-readable format following markdown conventions
</conversion_guidelines>

The source text is <source_text>{source_text}</source_text>.
"#;

/// System prompt for restructuring converted markdown.
pub const PAGE_REFINE_PROMPT: &str = r#"
You are an AI assistant whose goal is to refine technical documentation.  You will be provided with an existing
document in a markdown format (listed below as source_text).  Your task is to restructure the content for clarity
and readability.

While working towards the goal of creating the refined document, you will ALWAYS follow the below
general guidelines:
<guidelines>
- Think through the problem, extract all data from the task and the previous conversations before creating any plan.
- Never assume any parameter values while invoking a tool or function.
- You may not ask clarifying questions; if you need more information, indicate that in your output and stop.
</guidelines>

Additionally, you must ALWAYS follow these refinement_guidelines for the changes you produce:
<refinement_guidelines>
- You MUST retain all details about technical content such as API specifications, configuration values, code snippets, etc
- You MUST NOT add any information that is not present in the source_text
- You MUST produce output in a human-readable format following markdown conventions
- You should try to avoid using the exact same wording and structure as the source_text, unless it is required to retain technical detail
</refinement_guidelines>

The source text is <source_text>{source_text}</source_text>.
"#;

/// System prompt for merging several page summaries into one document.
pub const COMBINE_SUMMARIES_PROMPT: &str = r#"
You are an AI assistant whose goal is to combine summaries of related web pages into a single document.  You will
be provided with a list of markdown summaries (listed below as source_text), one per page.  Your task is to merge
them into one coherent, human-readable markdown document.

While working towards the goal of creating the combined document, you will ALWAYS follow the below
general guidelines:
<guidelines>
- Think through the problem, extract all data from the task and the previous conversations before creating any plan.
- Never assume any parameter values while invoking a tool or function.
- You may not ask clarifying questions; if you need more information, indicate that in your output and stop.
</guidelines>

Additionally, you must ALWAYS follow these combination_guidelines for the document you produce:
<combination_guidelines>
- You MUST retain all details about technical content such as API specifications, configuration values, code snippets, etc
- You MUST NOT add any information that is not present in the source_text
- You MUST merge content that appears in more than one summary instead of repeating it
- You MUST produce output in a human-readable format following markdown conventions
</combination_guidelines>

The source text is <source_text>{source_text}</source_text>.
"#;

pub const CONVERT_INSTRUCTION: &str = "Please convert the source text into markdown and store it.";
pub const REFINE_INSTRUCTION: &str = "Please refine the source text and store it.";
pub const COMBINE_INSTRUCTION: &str = "Please combine the summaries and store it.";

/// Conversion system prompt over the page's structured text.
pub fn format_page_to_markdown_prompt(source_text: &str) -> String {
    PAGE_TO_MARKDOWN_PROMPT.replace("{source_text}", source_text)
}

/// Refinement system prompt. The source text is embedded as a JSON string.
pub fn format_page_refine_prompt(source_text: &str) -> String {
    let encoded = escape_non_ascii(&serde_json::Value::String(source_text.to_string()).to_string());
    PAGE_REFINE_PROMPT.replace("{source_text}", &encoded)
}

/// Combine system prompt over a JSON array of page summaries.
pub fn format_combine_prompt(source_text: &str) -> String {
    COMBINE_SUMMARIES_PROMPT.replace("{source_text}", source_text)
}

/// Which kind of stored text a quality-control review covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStage {
    Conversion,
    Refinement,
    Combination,
}

impl ReviewStage {
    /// Adjective for the stored text, e.g. "converted".
    pub fn adjective(&self) -> &'static str {
        match self {
            ReviewStage::Conversion => "converted",
            ReviewStage::Refinement => "refined",
            ReviewStage::Combination => "combined",
        }
    }

    /// Noun for the step that produced the text, e.g. "conversion".
    pub fn noun(&self) -> &'static str {
        match self {
            ReviewStage::Conversion => "conversion",
            ReviewStage::Refinement => "refinement",
            ReviewStage::Combination => "combination",
        }
    }
}

/// The assistant/user pair that asks the model to re-check stored text.
pub fn review_turns(stage: ReviewStage, text: &str) -> [ChatMessage; 2] {
    let adjective = stage.adjective();
    let assistant = format!(
        "I stored the {adjective} text.  A copy of the {adjective} text is pasted below.  \
I will review it carefully and ensure that the following criteria are met:\n\
* The text follows markdown conventions\n\
* No important details were lost from the source text in the {noun}\n\
\n\
After performing this review, I will store the updated, {adjective} text.\n\
\n\
<{adjective}_text>{text}<\\{adjective}_text>",
        noun = stage.noun(),
    );

    [
        ChatMessage::assistant(assistant),
        ChatMessage::user(format!(
            "Please review the {adjective} text and store it."
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_client::Role;

    #[test]
    fn test_markdown_prompt_embeds_source() {
        let prompt = format_page_to_markdown_prompt(r#"{"Intro": [{"p": "hi"}]}"#);

        assert!(prompt.contains(r#"<source_text>{"Intro": [{"p": "hi"}]}</source_text>"#));
        assert!(!prompt.contains("{source_text}"));
    }

    #[test]
    fn test_refine_prompt_json_encodes_source() {
        let prompt = format_page_refine_prompt("# Title\n\"quoted\"");

        assert!(prompt.contains(r##"<source_text>"# Title\n\"quoted\""</source_text>"##));

        let prompt = format_page_refine_prompt("Résumé");
        assert!(prompt.contains(r#"<source_text>"R\u00e9sum\u00e9"</source_text>"#));
    }

    #[test]
    fn test_conversion_review_turns() {
        let [assistant, user] = review_turns(ReviewStage::Conversion, "# Doc");

        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant
            .text()
            .starts_with("I stored the converted text.  A copy of the converted text"));
        assert!(assistant
            .text()
            .contains("* No important details were lost from the source text in the conversion\n"));
        assert!(assistant
            .text()
            .ends_with("<converted_text># Doc<\\converted_text>"));

        assert_eq!(user.role, Role::User);
        assert_eq!(user.text(), "Please review the converted text and store it.");
    }

    #[test]
    fn test_refinement_review_turns() {
        let [assistant, user] = review_turns(ReviewStage::Refinement, "body");

        assert!(assistant.text().contains("in the refinement"));
        assert!(assistant.text().ends_with("<refined_text>body<\\refined_text>"));
        assert_eq!(user.text(), "Please review the refined text and store it.");
    }
}
