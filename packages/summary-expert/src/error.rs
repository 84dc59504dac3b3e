//! Typed errors for the summarization library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on what went wrong.

use chat_client::ChatError;
use thiserror::Error;

/// Errors that can occur while summarizing pages.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Fetching or parsing a page failed
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    /// The chat model could not be reached or returned an error
    #[error("model error: {0}")]
    Model(#[from] ChatError),

    /// The model answered without calling the expected store tool
    #[error("model response did not call {tool}")]
    MissingToolCall { tool: String },

    /// The model called a tool other than the one bound for this pass
    #[error("expected a call to {expected}, got {actual}")]
    UnexpectedToolCall { expected: String, actual: String },

    /// Tool call arguments did not match the tool's schema
    #[error("invalid arguments for {tool}: {reason}")]
    ToolArguments { tool: String, reason: String },

    /// A workflow state failed validation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Graph construction or execution failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Nothing to summarize
    #[error("no pages to summarize")]
    NoPages,

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Request failed before a response arrived
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
}

/// Errors raised by the graph engine itself.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node name was registered twice
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    /// A node name is reserved or empty
    #[error("invalid node name: {0:?}")]
    InvalidNodeName(String),

    /// An edge or router referenced a node that does not exist
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// No edge leaves the start of the graph
    #[error("graph has no entry point")]
    NoEntryPoint,

    /// A node has no outgoing edge
    #[error("node {0} has no outgoing edge")]
    DeadEnd(String),

    /// A node already has an outgoing edge
    #[error("node {0} already has an outgoing edge")]
    DuplicateEdge(String),

    /// Execution took more steps than allowed
    #[error("recursion limit of {limit} steps reached")]
    RecursionLimit { limit: usize },

    /// Reading or writing a checkpoint failed
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

/// Result type alias for summary operations.
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Result type alias for scrape operations.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for graph engine operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
