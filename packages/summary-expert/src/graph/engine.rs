//! A small state-graph runner.
//!
//! Nodes read the current state and return an update; the state's reducer
//! folds the update in. After each node, a direct edge or a router picks
//! the next node until the router returns [`END`]. Each step is recorded
//! with the graph's checkpointer under the caller's thread id.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::checkpoint::{Checkpoint, Checkpointer};
use crate::error::{GraphError, GraphResult, Result};

/// Virtual node the graph starts from.
pub const START: &str = "__start__";

/// Virtual node that stops execution.
pub const END: &str = "__end__";

pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// State threaded through a graph.
pub trait GraphState: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial change returned by a node.
    type Update: Debug + Send;

    /// Fold an update into the state.
    fn apply(&mut self, update: Self::Update);
}

/// A unit of work in a graph.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S) -> Result<S::Update>;
}

/// Adapter turning an async closure over an owned state into a [`Node`].
pub struct NodeFn<S, F> {
    func: F,
    _state: PhantomData<fn(S)>,
}

impl<S, F> NodeFn<S, F> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for NodeFn<S, F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Update>> + Send + 'static,
{
    async fn run(&self, state: &S) -> Result<S::Update> {
        (self.func)(state.clone()).await
    }
}

/// Picks the next node from the state after a node finishes.
pub type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

enum Edge<S> {
    Direct(String),
    Conditional(Router<S>),
}

/// Graph under construction.
pub struct StateGraph<S: GraphState> {
    nodes: IndexMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    errors: Vec<GraphError>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> &mut Self {
        let name = name.into();
        if name.is_empty() || name == START || name == END {
            self.errors.push(GraphError::InvalidNodeName(name));
        } else if self.nodes.contains_key(&name) {
            self.errors.push(GraphError::DuplicateNode(name));
        } else {
            self.nodes.insert(name, Arc::new(node));
        }
        self
    }

    /// Always go from `from` to `to`.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.insert_edge(from.into(), Edge::Direct(to.into()))
    }

    /// Let `router` choose where to go after `from`.
    pub fn add_conditional_edges<R, T>(&mut self, from: impl Into<String>, router: R) -> &mut Self
    where
        R: Fn(&S) -> T + Send + Sync + 'static,
        T: Into<String>,
    {
        let router: Router<S> = Arc::new(move |state: &S| router(state).into());
        self.insert_edge(from.into(), Edge::Conditional(router))
    }

    fn insert_edge(&mut self, from: String, edge: Edge<S>) -> &mut Self {
        if self.edges.contains_key(&from) {
            self.errors.push(GraphError::DuplicateEdge(from));
        } else {
            self.edges.insert(from, edge);
        }
        self
    }

    /// Validate the graph and attach a checkpointer.
    pub fn compile(mut self, checkpointer: Arc<dyn Checkpointer<S>>) -> GraphResult<CompiledGraph<S>> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }
        if !self.edges.contains_key(START) {
            return Err(GraphError::NoEntryPoint);
        }

        for (from, edge) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if let Edge::Direct(to) = edge {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(GraphError::UnknownNode(to.clone()));
                }
            }
        }

        if let Some(name) = self.nodes.keys().find(|name| !self.edges.contains_key(*name)) {
            return Err(GraphError::DeadEnd(name.clone()));
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            checkpointer,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        })
    }
}

/// A validated graph ready to run.
pub struct CompiledGraph<S: GraphState> {
    nodes: IndexMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    checkpointer: Arc<dyn Checkpointer<S>>,
    recursion_limit: usize,
}

impl<S: GraphState> CompiledGraph<S> {
    /// Maximum node executions per run.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    fn next_after(&self, from: &str, state: &S) -> GraphResult<String> {
        let next = match self.edges.get(from) {
            Some(Edge::Direct(to)) => to.clone(),
            Some(Edge::Conditional(router)) => router(state),
            None => return Err(GraphError::DeadEnd(from.to_string())),
        };

        if next != END && !self.nodes.contains_key(&next) {
            return Err(GraphError::UnknownNode(next));
        }
        Ok(next)
    }

    /// Run to completion, returning the input state and the state after every node.
    pub async fn stream(&self, input: S, thread_id: &str) -> Result<Vec<S>> {
        let mut state = input;
        let mut states = vec![state.clone()];
        self.checkpointer
            .put(Checkpoint::new(thread_id, 0, START, state.clone()))
            .await?;

        let mut current = self.next_after(START, &state)?;
        let mut step = 0;

        while current != END {
            step += 1;
            if step > self.recursion_limit {
                warn!(thread_id = %thread_id, node = %current, limit = self.recursion_limit, "Recursion limit reached");
                return Err(GraphError::RecursionLimit {
                    limit: self.recursion_limit,
                }
                .into());
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.clone()))?;

            info!("Entering node: {}", current);
            debug!("Starting state: {}", state_json(&state));

            let update = node.run(&state).await.map_err(|e| {
                warn!(thread_id = %thread_id, node = %current, error = %e, "Node failed");
                e
            })?;
            debug!("Output of {}: {:?}", current, update);

            state.apply(update);
            self.checkpointer
                .put(Checkpoint::new(thread_id, step, &current, state.clone()))
                .await?;
            states.push(state.clone());

            current = self.next_after(&current, &state)?;
        }

        debug!(thread_id = %thread_id, steps = step, "Graph finished");
        Ok(states)
    }

    /// Run to completion and return the final state.
    pub async fn invoke(&self, input: S, thread_id: &str) -> Result<S> {
        let mut states = self.stream(input, thread_id).await?;
        // stream always yields at least the input state
        states
            .pop()
            .ok_or_else(|| GraphError::Checkpoint("run produced no states".into()).into())
    }

    /// Latest recorded state for a thread.
    pub async fn get_state(&self, thread_id: &str) -> GraphResult<Option<S>> {
        Ok(self
            .checkpointer
            .latest(thread_id)
            .await?
            .map(|checkpoint| checkpoint.state))
    }

    /// Every checkpoint recorded for a thread, oldest first.
    pub async fn history(&self, thread_id: &str) -> GraphResult<Vec<Checkpoint<S>>> {
        self.checkpointer.list(thread_id).await
    }
}

fn state_json<S: Serialize>(state: &S) -> String {
    serde_json::to_string(state).unwrap_or_else(|e| format!("<unserializable state: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummaryError;
    use crate::graph::checkpoint::MemorySaver;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Counter {
        count: u32,
        log: Vec<String>,
    }

    #[derive(Debug)]
    struct CounterUpdate {
        add: u32,
        entry: String,
    }

    impl GraphState for Counter {
        type Update = CounterUpdate;

        fn apply(&mut self, update: CounterUpdate) {
            self.count += update.add;
            self.log.push(update.entry);
        }
    }

    fn increment(entry: &'static str) -> NodeFn<Counter, impl Fn(Counter) -> futures::future::Ready<Result<CounterUpdate>>> {
        NodeFn::new(move |_state: Counter| {
            futures::future::ready(Ok(CounterUpdate {
                add: 1,
                entry: entry.to_string(),
            }))
        })
    }

    fn saver() -> Arc<dyn Checkpointer<Counter>> {
        Arc::new(MemorySaver::<Counter>::new())
    }

    fn counting_graph(target: u32) -> StateGraph<Counter> {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("first", increment("first"))
            .add_node("loop", increment("loop"))
            .add_edge(START, "first")
            .add_edge("first", "loop")
            .add_conditional_edges("loop", move |state: &Counter| {
                if state.count < target {
                    "loop"
                } else {
                    END
                }
            });
        graph
    }

    #[tokio::test]
    async fn test_stream_runs_until_end() {
        let graph = counting_graph(3).compile(saver()).unwrap();

        let states = graph.stream(Counter::default(), "t1").await.unwrap();

        assert_eq!(states.len(), 4);
        assert_eq!(states[0].count, 0);
        let last = states.last().unwrap();
        assert_eq!(last.count, 3);
        assert_eq!(last.log, vec!["first", "loop", "loop"]);

        let history = graph.history("t1").await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].node, START);
        assert_eq!(history[3].node, "loop");
        assert_eq!(history[3].step, 3);
    }

    #[tokio::test]
    async fn test_invoke_returns_final_state_and_records_thread() {
        let graph = counting_graph(2).compile(saver()).unwrap();

        let state = graph.invoke(Counter::default(), "t2").await.unwrap();
        assert_eq!(state.count, 2);

        let saved = graph.get_state("t2").await.unwrap().unwrap();
        assert_eq!(saved.count, 2);
        assert!(graph.get_state("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rerun_replaces_thread_history() {
        let graph = counting_graph(2).compile(saver()).unwrap();

        graph.invoke(Counter::default(), "t").await.unwrap();
        graph.invoke(Counter::default(), "t").await.unwrap();

        let steps: Vec<usize> = graph
            .history("t")
            .await
            .unwrap()
            .iter()
            .map(|checkpoint| checkpoint.step)
            .collect();
        assert_eq!(steps, vec![0, 1, 2]);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_node_output_log_names_node() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let graph = counting_graph(2).compile(saver()).unwrap();
        graph.invoke(Counter::default(), "t").await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Entering node: first"));
        assert!(output.contains("Output of first: CounterUpdate { add: 1, entry: \"first\" }"));
        assert!(output.contains("Output of loop: CounterUpdate"));
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let graph = counting_graph(100)
            .compile(saver())
            .unwrap()
            .with_recursion_limit(5);

        let err = graph.invoke(Counter::default(), "t").await.unwrap_err();
        assert!(matches!(
            err,
            SummaryError::Graph(GraphError::RecursionLimit { limit: 5 })
        ));
    }

    #[tokio::test]
    async fn test_router_to_unknown_node_fails() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("only", increment("only"))
            .add_edge(START, "only")
            .add_conditional_edges("only", |_: &Counter| "missing");
        let graph = graph.compile(saver()).unwrap();

        let err = graph.invoke(Counter::default(), "t").await.unwrap_err();
        assert!(matches!(err, SummaryError::Graph(GraphError::UnknownNode(ref n)) if n == "missing"));
    }

    #[tokio::test]
    async fn test_node_error_propagates() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node(
                "fails",
                NodeFn::new(|_: Counter| async {
                    Err::<CounterUpdate, SummaryError>(SummaryError::InvalidState("bad".into()))
                }),
            )
            .add_edge(START, "fails")
            .add_edge("fails", END);
        let graph = graph.compile(saver()).unwrap();

        let err = graph.invoke(Counter::default(), "t").await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidState(_)));
    }

    #[test]
    fn test_compile_requires_entry_point() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("a", increment("a")).add_edge("a", END);

        let err = graph.compile(saver()).err().unwrap();
        assert!(matches!(err, GraphError::NoEntryPoint));
    }

    #[test]
    fn test_compile_rejects_unknown_edge_target() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("a", increment("a"))
            .add_edge(START, "a")
            .add_edge("a", "b");

        let err = graph.compile(saver()).err().unwrap();
        assert!(matches!(err, GraphError::UnknownNode(ref n) if n == "b"));
    }

    #[test]
    fn test_compile_rejects_dead_end_and_duplicates() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("a", increment("a")).add_edge(START, "a");
        let err = graph.compile(saver()).err().unwrap();
        assert!(matches!(err, GraphError::DeadEnd(ref n) if n == "a"));

        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("a", increment("a"))
            .add_node("a", increment("again"))
            .add_edge(START, "a")
            .add_edge("a", END);
        let err = graph.compile(saver()).err().unwrap();
        assert!(matches!(err, GraphError::DuplicateNode(_)));

        let mut graph = StateGraph::<Counter>::new();
        graph.add_node(END, increment("end"));
        let err = graph.compile(saver()).err().unwrap();
        assert!(matches!(err, GraphError::InvalidNodeName(_)));
    }
}
