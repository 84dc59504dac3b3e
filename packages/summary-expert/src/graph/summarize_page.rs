//! The summarize-page workflow as a state graph.
//!
//! ```text
//! START -> validate -> convert_initial -> store_convert
//! store_convert / store_refine --next_node--> convert_2nd | refine_initial | refine_2nd | END
//! convert_2nd -> store_convert
//! refine_initial, refine_2nd -> store_refine
//! ```

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use chat_client::ChatMessage;

use super::checkpoint::Checkpointer;
use super::engine::{CompiledGraph, GraphState, NodeFn, StateGraph, END, START};
use crate::error::{Result, SummaryError};
use crate::pipeline::prompts::{
    format_page_refine_prompt, format_page_to_markdown_prompt, review_turns, ReviewStage,
    CONVERT_INSTRUCTION, REFINE_INSTRUCTION,
};
use crate::tools::StoreKind;
use crate::traits::model::ChatModel;
use crate::types::page::{to_indented_json, PageContent};

pub const NODE_VALIDATE_STARTING_STATE: &str = "node_validate_starting_state";
pub const NODE_INVOKE_LLM_CONVERT_INITIAL: &str = "node_invoke_llm_convert_initial";
pub const NODE_INVOKE_LLM_CONVERT_2ND_PASS: &str = "node_invoke_llm_convert_2nd_pass";
pub const NODE_INVOKE_LLM_REFINE_INITIAL: &str = "node_invoke_llm_refine_initial";
pub const NODE_INVOKE_LLM_REFINE_2ND_PASS: &str = "node_invoke_llm_refine_2nd_pass";
pub const NODE_STORE_TEXT_CONVERT: &str = "node_store_text_convert";
pub const NODE_STORE_TEXT_REFINE: &str = "node_store_text_refine";

/// Progress of one page through conversion and refinement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizePageState {
    pub raw_page: PageContent,
    pub converted_page: String,
    pub refined_page: String,
    pub convert_turns: Vec<ChatMessage>,
    pub refine_turns: Vec<ChatMessage>,
    pub convert_complete: bool,
    pub refine_1st_complete: bool,
    pub refine_2nd_complete: bool,
}

impl SummarizePageState {
    /// Starting state for a scraped page.
    pub fn for_page(raw_page: PageContent) -> Self {
        Self {
            raw_page,
            ..Self::default()
        }
    }
}

/// Changes a node makes. Turns are appended; everything else overwrites.
#[derive(Debug, Default)]
pub struct SummarizePageUpdate {
    pub converted_page: Option<String>,
    pub refined_page: Option<String>,
    pub convert_turns: Vec<ChatMessage>,
    pub refine_turns: Vec<ChatMessage>,
    pub convert_complete: Option<bool>,
    pub refine_1st_complete: Option<bool>,
    pub refine_2nd_complete: Option<bool>,
}

impl GraphState for SummarizePageState {
    type Update = SummarizePageUpdate;

    fn apply(&mut self, update: SummarizePageUpdate) {
        if let Some(text) = update.converted_page {
            self.converted_page = text;
        }
        if let Some(text) = update.refined_page {
            self.refined_page = text;
        }
        self.convert_turns.extend(update.convert_turns);
        self.refine_turns.extend(update.refine_turns);
        if let Some(done) = update.convert_complete {
            self.convert_complete = done;
        }
        if let Some(done) = update.refine_1st_complete {
            self.refine_1st_complete = done;
        }
        if let Some(done) = update.refine_2nd_complete {
            self.refine_2nd_complete = done;
        }
    }
}

/// Where to go after a store node.
pub fn next_node(state: &SummarizePageState) -> &'static str {
    if !state.convert_complete {
        NODE_INVOKE_LLM_CONVERT_2ND_PASS
    } else if !state.refine_1st_complete {
        NODE_INVOKE_LLM_REFINE_INITIAL
    } else if !state.refine_2nd_complete {
        NODE_INVOKE_LLM_REFINE_2ND_PASS
    } else {
        END
    }
}

pub async fn node_validate_starting_state(
    state: &SummarizePageState,
) -> Result<SummarizePageUpdate> {
    if state.raw_page.is_empty() {
        return Err(SummaryError::InvalidState("raw page is empty".into()));
    }
    if !state.convert_turns.is_empty() || !state.refine_turns.is_empty() {
        return Err(SummaryError::InvalidState(
            "conversation turns must start empty".into(),
        ));
    }
    if state.convert_complete || state.refine_1st_complete || state.refine_2nd_complete {
        return Err(SummaryError::InvalidState(
            "completion flags must start unset".into(),
        ));
    }

    Ok(SummarizePageUpdate {
        convert_complete: Some(false),
        refine_1st_complete: Some(false),
        refine_2nd_complete: Some(false),
        ..SummarizePageUpdate::default()
    })
}

pub async fn node_invoke_llm_convert_initial(
    model: &dyn ChatModel,
    state: &SummarizePageState,
) -> Result<SummarizePageUpdate> {
    let source_text = to_indented_json(&state.raw_page)?;
    let mut turns = vec![
        ChatMessage::system(format_page_to_markdown_prompt(&source_text)),
        ChatMessage::user(CONVERT_INSTRUCTION),
    ];
    let response = model.invoke(&turns).await?;
    turns.push(response);

    Ok(SummarizePageUpdate {
        convert_turns: turns,
        ..SummarizePageUpdate::default()
    })
}

pub async fn node_invoke_llm_convert_2nd_pass(
    model: &dyn ChatModel,
    state: &SummarizePageState,
) -> Result<SummarizePageUpdate> {
    let mut new_turns: Vec<ChatMessage> =
        review_turns(ReviewStage::Conversion, &state.converted_page).into();
    let context: Vec<ChatMessage> = state
        .convert_turns
        .iter()
        .chain(new_turns.iter())
        .cloned()
        .collect();
    let response = model.invoke(&context).await?;
    new_turns.push(response);

    Ok(SummarizePageUpdate {
        convert_turns: new_turns,
        convert_complete: Some(true),
        ..SummarizePageUpdate::default()
    })
}

pub async fn node_invoke_llm_refine_initial(
    model: &dyn ChatModel,
    state: &SummarizePageState,
) -> Result<SummarizePageUpdate> {
    let mut turns = vec![
        ChatMessage::system(format_page_refine_prompt(&state.converted_page)),
        ChatMessage::user(REFINE_INSTRUCTION),
    ];
    let response = model.invoke(&turns).await?;
    turns.push(response);

    Ok(SummarizePageUpdate {
        refine_turns: turns,
        refine_1st_complete: Some(true),
        ..SummarizePageUpdate::default()
    })
}

pub async fn node_invoke_llm_refine_2nd_pass(
    model: &dyn ChatModel,
    state: &SummarizePageState,
) -> Result<SummarizePageUpdate> {
    let mut new_turns: Vec<ChatMessage> =
        review_turns(ReviewStage::Refinement, &state.refined_page).into();
    let context: Vec<ChatMessage> = state
        .refine_turns
        .iter()
        .chain(new_turns.iter())
        .cloned()
        .collect();
    let response = model.invoke(&context).await?;
    new_turns.push(response);

    Ok(SummarizePageUpdate {
        refine_turns: new_turns,
        refine_2nd_complete: Some(true),
        ..SummarizePageUpdate::default()
    })
}

/// Run the store tool from the model's latest turn and acknowledge it.
async fn store_last_call(
    kind: StoreKind,
    turns: &[ChatMessage],
) -> Result<(String, ChatMessage)> {
    let call = turns
        .last()
        .and_then(ChatMessage::last_tool_call)
        .ok_or_else(|| SummaryError::MissingToolCall {
            tool: kind.tool_name().to_string(),
        })?;

    let text = kind.store(call).await?;
    Ok((text, kind.tool_message(call)))
}

pub async fn node_store_text_convert(state: &SummarizePageState) -> Result<SummarizePageUpdate> {
    let (text, ack) = store_last_call(StoreKind::Conversion, &state.convert_turns).await?;

    Ok(SummarizePageUpdate {
        converted_page: Some(text),
        convert_turns: vec![ack],
        ..SummarizePageUpdate::default()
    })
}

pub async fn node_store_text_refine(state: &SummarizePageState) -> Result<SummarizePageUpdate> {
    let (text, ack) = store_last_call(StoreKind::Refinement, &state.refine_turns).await?;

    Ok(SummarizePageUpdate {
        refined_page: Some(text),
        refine_turns: vec![ack],
        ..SummarizePageUpdate::default()
    })
}

type UpdateFuture = BoxFuture<'static, Result<SummarizePageUpdate>>;
type ModelNode = fn(Arc<dyn ChatModel>, SummarizePageState) -> UpdateFuture;

/// Node that hands its own handle on `model` to `run`.
fn model_node(
    model: &Arc<dyn ChatModel>,
    run: ModelNode,
) -> NodeFn<SummarizePageState, impl Fn(SummarizePageState) -> UpdateFuture> {
    let model = Arc::clone(model);
    NodeFn::new(move |state| run(Arc::clone(&model), state))
}

/// Build the summarize-page graph over the given models.
pub fn build_summarize_page_graph(
    convert: Arc<dyn ChatModel>,
    refine: Arc<dyn ChatModel>,
    checkpointer: Arc<dyn Checkpointer<SummarizePageState>>,
) -> Result<CompiledGraph<SummarizePageState>> {
    let mut graph = StateGraph::<SummarizePageState>::new();

    graph
        .add_node(
            NODE_VALIDATE_STARTING_STATE,
            NodeFn::new(|state: SummarizePageState| async move {
                node_validate_starting_state(&state).await
            }),
        )
        .add_node(
            NODE_INVOKE_LLM_CONVERT_INITIAL,
            model_node(&convert, |model, state| {
                Box::pin(async move { node_invoke_llm_convert_initial(model.as_ref(), &state).await })
            }),
        )
        .add_node(
            NODE_INVOKE_LLM_CONVERT_2ND_PASS,
            model_node(&convert, |model, state| {
                Box::pin(async move { node_invoke_llm_convert_2nd_pass(model.as_ref(), &state).await })
            }),
        )
        .add_node(
            NODE_INVOKE_LLM_REFINE_INITIAL,
            model_node(&refine, |model, state| {
                Box::pin(async move { node_invoke_llm_refine_initial(model.as_ref(), &state).await })
            }),
        )
        .add_node(
            NODE_INVOKE_LLM_REFINE_2ND_PASS,
            model_node(&refine, |model, state| {
                Box::pin(async move { node_invoke_llm_refine_2nd_pass(model.as_ref(), &state).await })
            }),
        )
        .add_node(
            NODE_STORE_TEXT_CONVERT,
            NodeFn::new(|state: SummarizePageState| async move {
                node_store_text_convert(&state).await
            }),
        )
        .add_node(
            NODE_STORE_TEXT_REFINE,
            NodeFn::new(|state: SummarizePageState| async move {
                node_store_text_refine(&state).await
            }),
        );

    graph
        .add_edge(START, NODE_VALIDATE_STARTING_STATE)
        .add_edge(NODE_VALIDATE_STARTING_STATE, NODE_INVOKE_LLM_CONVERT_INITIAL)
        .add_edge(NODE_INVOKE_LLM_CONVERT_INITIAL, NODE_STORE_TEXT_CONVERT)
        .add_edge(NODE_INVOKE_LLM_CONVERT_2ND_PASS, NODE_STORE_TEXT_CONVERT)
        .add_edge(NODE_INVOKE_LLM_REFINE_INITIAL, NODE_STORE_TEXT_REFINE)
        .add_edge(NODE_INVOKE_LLM_REFINE_2ND_PASS, NODE_STORE_TEXT_REFINE)
        .add_conditional_edges(NODE_STORE_TEXT_CONVERT, next_node)
        .add_conditional_edges(NODE_STORE_TEXT_REFINE, next_node);

    Ok(graph.compile(checkpointer)?)
}

/// Runs pages through the summarize-page graph.
pub struct SummarizePageRunner {
    graph: CompiledGraph<SummarizePageState>,
}

impl SummarizePageRunner {
    pub fn new(graph: CompiledGraph<SummarizePageState>) -> Self {
        Self { graph }
    }

    /// Build the graph over `convert` and `refine` and wrap it.
    pub fn build(
        convert: Arc<dyn ChatModel>,
        refine: Arc<dyn ChatModel>,
        checkpointer: Arc<dyn Checkpointer<SummarizePageState>>,
    ) -> Result<Self> {
        Ok(Self::new(build_summarize_page_graph(
            convert,
            refine,
            checkpointer,
        )?))
    }

    pub fn graph(&self) -> &CompiledGraph<SummarizePageState> {
        &self.graph
    }

    /// Run `state` to completion under `thread_id` and return the final state.
    pub async fn run(&self, state: SummarizePageState, thread_id: &str) -> Result<SummarizePageState> {
        info!(thread_id = %thread_id, sections = state.raw_page.len(), "Summarizing page");

        let states = self.graph.stream(state, thread_id).await?;
        for (step, value) in states.iter().enumerate() {
            debug!(
                thread_id = %thread_id,
                step,
                convert_complete = value.convert_complete,
                refine_1st_complete = value.refine_1st_complete,
                refine_2nd_complete = value.refine_2nd_complete,
                "Graph state"
            );
        }

        states
            .into_iter()
            .last()
            .ok_or_else(|| SummaryError::InvalidState("graph produced no states".into()))
    }
}
