//! Checkpoint stores for graph runs.
//!
//! A checkpoint is a snapshot of the state after one step of a run, keyed
//! by the caller's thread id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// State after one step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub thread_id: String,

    /// 0 for the input state, then one per node executed
    pub step: usize,

    /// Node that produced this state
    pub node: String,

    pub state: S,

    pub created_at: DateTime<Utc>,
}

impl<S> Checkpoint<S> {
    pub fn new(thread_id: &str, step: usize, node: &str, state: S) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step,
            node: node.to_string(),
            state,
            created_at: Utc::now(),
        }
    }
}

/// Storage for checkpoints, grouped by thread id.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync {
    /// Record a checkpoint under its thread id. A step-0 checkpoint starts
    /// a new run and replaces the thread's earlier history.
    async fn put(&self, checkpoint: Checkpoint<S>) -> GraphResult<()>;

    /// Most recent checkpoint for a thread.
    async fn latest(&self, thread_id: &str) -> GraphResult<Option<Checkpoint<S>>>;

    /// All checkpoints for a thread, oldest first.
    async fn list(&self, thread_id: &str) -> GraphResult<Vec<Checkpoint<S>>>;
}

/// In-memory checkpoint store. Contents are lost when dropped.
#[derive(Debug)]
pub struct MemorySaver<S> {
    threads: RwLock<HashMap<String, Vec<Checkpoint<S>>>>,
}

impl<S> Default for MemorySaver<S> {
    fn default() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> MemorySaver<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread ids with at least one checkpoint.
    pub async fn threads(&self) -> Vec<String> {
        self.threads.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(&self, checkpoint: Checkpoint<S>) -> GraphResult<()> {
        let mut threads = self.threads.write().await;
        let history = threads.entry(checkpoint.thread_id.clone()).or_default();
        if checkpoint.step == 0 {
            history.clear();
        }
        history.push(checkpoint);
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> GraphResult<Option<Checkpoint<S>>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .and_then(|checkpoints| checkpoints.last().cloned()))
    }

    async fn list(&self, thread_id: &str) -> GraphResult<Vec<Checkpoint<S>>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Checkpoints appended as JSON lines, one file per thread. The file is
/// truncated when a run starts.
#[derive(Debug, Clone)]
pub struct JsonFileSaver<S> {
    dir: PathBuf,
    _state: PhantomData<fn() -> S>,
}

impl<S> JsonFileSaver<S> {
    /// Store checkpoints under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _state: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a thread's checkpoints.
    pub fn thread_path(&self, thread_id: &str) -> PathBuf {
        let name: String = thread_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.jsonl", name))
    }
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> GraphError {
    GraphError::Checkpoint(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl<S> Checkpointer<S> for JsonFileSaver<S>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn put(&self, checkpoint: Checkpoint<S>) -> GraphResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let path = self.thread_path(&checkpoint.thread_id);
        let mut line = serde_json::to_string(&checkpoint).map_err(|e| io_error(&path, e))?;
        line.push('\n');

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        if checkpoint.step == 0 {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let mut file = options
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), step = checkpoint.step, "Checkpoint written");
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> GraphResult<Option<Checkpoint<S>>> {
        Ok(self.list(thread_id).await?.pop())
    }

    async fn list(&self, thread_id: &str) -> GraphResult<Vec<Checkpoint<S>>> {
        let path = self.thread_path(thread_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&path, e)),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| io_error(&path, e)))
            .collect()
    }
}
