//! Summarize one or more web pages into a single markdown document.
//!
//! ```text
//! gen-summary --urls https://a.example/docs,https://b.example/docs --output summary.md
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use summary_expert::graph::Checkpointer;
use summary_expert::{
    HttpScraper, JsonFileSaver, MemorySaver, PipelineMode, SummarizePageRunner,
    SummarizePageState, SummaryChain, SummaryPipeline,
};
use tracing::info;

mod config;
mod logging;

use config::Settings;

#[derive(Parser, Debug)]
#[command(name = "gen-summary")]
#[command(about = "Summarize web pages into markdown")]
#[command(version)]
struct Cli {
    /// A comma-separated list of URLs to summarize
    #[arg(long, required = true, value_delimiter = ',')]
    urls: Vec<String>,

    /// The output file location to save the generated markdown
    #[arg(long)]
    output: PathBuf,

    /// How each page is summarized (chain or graph)
    #[arg(long, default_value = "chain")]
    mode: PipelineMode,

    /// Persist graph checkpoints as JSON lines in this directory
    #[arg(long, env = "GEN_SUMMARY_CHECKPOINT_DIR")]
    checkpoint_dir: Option<PathBuf>,

    #[arg(long, env = "GEN_SUMMARY_DEBUG_LOG", default_value = "./debug.log")]
    debug_log: PathBuf,

    #[arg(long, env = "GEN_SUMMARY_INFO_LOG", default_value = "./info.log")]
    info_log: PathBuf,

    /// Model name (overrides LLM_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (overrides LLM_TEMPERATURE)
    #[arg(long)]
    temperature: Option<f32>,

    /// Completion token limit (overrides LLM_MAX_TOKENS)
    #[arg(long)]
    max_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    logging::configure_logging(&cli.debug_log, &cli.info_log)?;
    let settings = Settings::from_env()?;

    let mut model = settings.model.clone();
    if let Some(name) = cli.model {
        model = model.with_model(name);
    }
    if let Some(temperature) = cli.temperature {
        model = model.with_temperature(temperature);
    }
    if let Some(max_tokens) = cli.max_tokens {
        model = model.with_max_tokens(max_tokens);
    }

    let urls: Vec<String> = cli
        .urls
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    info!("Output file location: {}", cli.output.display());

    let chain = SummaryChain::from_client(&settings.chat_client(), &model);
    let scraper = HttpScraper::new().context("Failed to build HTTP client")?;
    let mut pipeline = SummaryPipeline::new(Arc::new(scraper), chain.clone());

    if cli.mode == PipelineMode::Graph {
        let checkpointer: Arc<dyn Checkpointer<SummarizePageState>> = match cli.checkpoint_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                Arc::new(JsonFileSaver::new(dir))
            }
            None => Arc::new(MemorySaver::new()),
        };
        let runner = SummarizePageRunner::build(
            chain.convert_model(),
            chain.refine_model(),
            checkpointer,
        )?;
        pipeline = pipeline.with_graph(runner);
    }

    let output = pipeline.run(&urls).await?;

    std::fs::write(&cli.output, output.final_text())
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!("Summary written to {}", cli.output.display());

    Ok(())
}
