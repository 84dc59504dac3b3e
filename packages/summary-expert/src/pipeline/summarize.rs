//! Summarization pipeline - scrape, convert, refine, combine.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, SummaryError};
use crate::graph::summarize_page::{SummarizePageRunner, SummarizePageState};
use crate::pipeline::chain::SummaryChain;
use crate::traits::source::PageSource;
use crate::types::page::{to_prompt_json, ScrapedPage};
use crate::types::pass::SummarizationPass;

/// How each page is taken through conversion and refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// Call the passes in sequence
    #[default]
    Chain,

    /// Run the summarize-page graph
    Graph,
}

impl std::str::FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chain" => Ok(PipelineMode::Chain),
            "graph" => Ok(PipelineMode::Graph),
            other => Err(format!("unknown pipeline mode: {}", other)),
        }
    }
}

/// Result of summarizing a set of pages.
#[derive(Debug, Clone)]
pub struct SummaryOutput {
    /// Final refinement pass for each page, in input order
    pub pages: Vec<SummarizationPass>,

    /// Combined pass, present when more than one page was summarized
    pub combined: Option<SummarizationPass>,
}

impl SummaryOutput {
    /// The markdown to write out.
    pub fn final_text(&self) -> &str {
        match (&self.combined, self.pages.first()) {
            (Some(combined), _) => &combined.text,
            (None, Some(page)) => &page.text,
            (None, None) => "",
        }
    }
}

/// Fetches pages and turns them into one markdown summary.
pub struct SummaryPipeline {
    source: Arc<dyn PageSource>,
    chain: SummaryChain,
    graph: Option<SummarizePageRunner>,
}

impl SummaryPipeline {
    /// Pipeline that summarizes each page with the chain passes.
    pub fn new(source: Arc<dyn PageSource>, chain: SummaryChain) -> Self {
        Self {
            source,
            chain,
            graph: None,
        }
    }

    /// Summarize each page with the summarize-page graph instead.
    pub fn with_graph(mut self, runner: SummarizePageRunner) -> Self {
        self.graph = Some(runner);
        self
    }

    pub fn mode(&self) -> PipelineMode {
        if self.graph.is_some() {
            PipelineMode::Graph
        } else {
            PipelineMode::Chain
        }
    }

    /// Summarize `urls` into a single document.
    pub async fn run(&self, urls: &[String]) -> Result<SummaryOutput> {
        if urls.is_empty() {
            return Err(SummaryError::NoPages);
        }

        info!("URLs: {}", urls.join(","));
        let pages = self.source.fetch_pages(urls).await?;

        let mut results = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let result = match &self.graph {
                Some(runner) => summarize_with_graph(runner, page, index).await?,
                None => self.summarize_with_chain(page).await?,
            };

            info!("Summary completed for page: {}", page.url);
            info!("Final refined text: \n{}", result.text);
            results.push(result);
        }

        let combined = if results.len() > 1 {
            Some(self.combine(&results).await?)
        } else {
            None
        };

        Ok(SummaryOutput {
            pages: results,
            combined,
        })
    }

    async fn summarize_with_chain(&self, page: &ScrapedPage) -> Result<SummarizationPass> {
        let url = Some(page.url.clone());

        info!("1st pass on converting page: {}", page.url);
        let pass = self
            .chain
            .perform_initial_conversion(SummarizationPass::new(url.clone(), page.source_text()?))
            .await?;
        debug!("Conversion results: {}", serde_json::to_string(&pass)?);

        info!("QC pass on converting page: {}", page.url);
        let pass = self.chain.perform_conversion_qc(pass).await?;
        debug!("Conversion QC results: {}", serde_json::to_string(&pass)?);

        info!("1st pass on refining page: {}", page.url);
        let pass = self
            .chain
            .perform_initial_refinement(SummarizationPass::new(url, pass.text))
            .await?;
        debug!("Refinement results: {}", serde_json::to_string(&pass)?);

        info!("QC pass on refining page: {}", page.url);
        let pass = self.chain.perform_refinement_qc(pass).await?;
        debug!("Refinement QC results: {}", serde_json::to_string(&pass)?);

        Ok(pass)
    }

    async fn combine(&self, results: &[SummarizationPass]) -> Result<SummarizationPass> {
        info!("Combining summaries...");
        let texts: Vec<&str> = results.iter().map(|pass| pass.text.as_str()).collect();
        let pass = SummarizationPass::new(None, to_prompt_json(&texts)?);

        let combined = self.chain.perform_combined_summary(pass).await?;
        debug!("Combined summary: \n{}", serde_json::to_string(&combined)?);
        Ok(combined)
    }
}

async fn summarize_with_graph(
    runner: &SummarizePageRunner,
    page: &ScrapedPage,
    index: usize,
) -> Result<SummarizationPass> {
    let thread_id = index.to_string();
    let state = runner
        .run(SummarizePageState::for_page(page.content.clone()), &thread_id)
        .await?;

    Ok(SummarizationPass {
        url: Some(page.url.clone()),
        text: state.refined_page,
        turns: state.refine_turns,
    })
}
