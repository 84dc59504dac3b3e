//! Web Page Summarization Library
//!
//! Scrapes web pages into heading-structured content and turns them into
//! refined markdown summaries through a sequence of chat-model passes.
//!
//! # How a page is summarized
//!
//! - Convert the structured page to markdown, then review the conversion
//! - Refine the markdown in a fresh conversation, then review the refinement
//! - Combine the page summaries when more than one page was given
//!
//! Every pass binds a single no-op store tool to the model, so the model's
//! output always arrives in one well-formed field.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use summary_expert::{HttpScraper, ModelSettings, SummaryChain, SummaryPipeline};
//!
//! let client = chat_client::ChatClient::from_env()?;
//! let chain = SummaryChain::from_client(&client, &ModelSettings::default());
//! let pipeline = SummaryPipeline::new(Arc::new(HttpScraper::new()?), chain);
//!
//! let output = pipeline.run(&["https://example.com/docs".to_string()]).await?;
//! println!("{}", output.final_text());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for models and page sources
//! - [`types`] - Page content and summarization pass types
//! - [`scraping`] - HTML structure extraction and the HTTP page source
//! - [`tools`] - Store tools bound to the models
//! - [`ai`] - Chat-completions model implementation
//! - [`pipeline`] - Prompts, summarization passes and the end-to-end pipeline
//! - [`graph`] - State-graph engine and the summarize-page workflow
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod scraping;
pub mod testing;
pub mod tools;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{GraphError, Result, ScrapeError, SummaryError};
pub use traits::{model::ChatModel, source::PageSource};
pub use types::{
    page::{Fragment, PageContent, ScrapedPage, TableData},
    pass::{SummarizationPass, SummarizationPassBatch},
};

pub use ai::{ModelSettings, ToolBoundModel};
pub use graph::{
    CompiledGraph, JsonFileSaver, MemorySaver, StateGraph, SummarizePageRunner,
    SummarizePageState,
};
pub use pipeline::{PipelineMode, SummaryChain, SummaryOutput, SummaryPipeline};
pub use scraping::{extract_page_structure, HttpScraper};
pub use tools::{StoreCombinedPageSummary, StoreConvertedPage, StoreKind, StoreRefinedPageSummary};
