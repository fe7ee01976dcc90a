//! Append-only JSONL task store.
//!
//! Each committed task is written as one JSON line. Appends take an
//! exclusive file lock so concurrent sessions never interleave lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::domain::CapturedTask;

use super::TaskStore;

/// Lifecycle of a stored task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredStatus {
    Open,
    Done,
}

/// A task as written to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTask {
    /// When the task was committed
    pub committed_at: DateTime<Utc>,

    pub status: StoredStatus,

    #[serde(flatten)]
    pub task: CapturedTask,
}

/// File-based task store using JSONL format
pub struct JsonlTaskStore {
    path: PathBuf,
}

impl JsonlTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::tasks_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored task in commit order. Unparseable lines are skipped
    /// with a warning.
    pub async fn list(&self) -> Result<Vec<StoredTask>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read task store: {}", self.path.display()))?;

        let mut tasks = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredTask>(line) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(line = line_no + 1, error = %e, "Skipping unreadable task line"),
            }
        }

        Ok(tasks)
    }

    fn append_locked(path: &Path, line: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open task store: {}", path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire file lock on task store")?;

        writeln!(file, "{}", line).context("Failed to write task")?;
        file.flush().context("Failed to flush task")?;

        // Lock is released when file is dropped
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonlTaskStore {
    async fn open_tasks(&self) -> Result<Vec<String>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.status == StoredStatus::Open)
            .map(|t| t.task.content)
            .collect())
    }

    async fn persist(&self, task: &CapturedTask) -> Result<()> {
        let stored = StoredTask {
            committed_at: Utc::now(),
            status: StoredStatus::Open,
            task: task.clone(),
        };
        let line = serde_json::to_string(&stored).context("Failed to serialize task")?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::append_locked(&path, &line))
            .await
            .context("Task store writer panicked")?
    }
}
