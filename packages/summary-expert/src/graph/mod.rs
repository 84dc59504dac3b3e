//! State-graph workflows.
//!
//! `engine` runs a graph of async nodes over a shared state; `checkpoint`
//! records every step; `summarize_page` wires the page summarization
//! workflow onto the engine.

pub mod checkpoint;
pub mod engine;
pub mod summarize_page;

pub use checkpoint::{Checkpoint, Checkpointer, JsonFileSaver, MemorySaver};
pub use engine::{
    CompiledGraph, GraphState, Node, NodeFn, Router, StateGraph, DEFAULT_RECURSION_LIMIT, END,
    START,
};
pub use summarize_page::{
    build_summarize_page_graph, next_node, SummarizePageRunner, SummarizePageState,
    SummarizePageUpdate,
};
