//! Summarization pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Scraping each URL into heading-structured content
//! - Conversion to markdown, then a quality-control pass
//! - Refinement in a fresh conversation, then a quality-control pass
//! - Combining page summaries when more than one page was given

pub mod chain;
pub mod prompts;
pub mod summarize;

pub use chain::{run_pass, SummaryChain, BATCH_SIZE};
pub use prompts::{
    format_combine_prompt, format_page_refine_prompt, format_page_to_markdown_prompt,
    review_turns, ReviewStage, COMBINE_INSTRUCTION, CONVERT_INSTRUCTION, REFINE_INSTRUCTION,
};
pub use summarize::{PipelineMode, SummaryOutput, SummaryPipeline};
