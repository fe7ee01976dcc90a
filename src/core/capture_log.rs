//! Append-only capture log with file-based persistence.
//!
//! Session events are stored as newline-delimited JSON (JSONL), one file for
//! every session ever run, so the log can be tailed or grepped directly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::{CaptureEvent, CaptureEventType};

/// File-based capture log using JSONL format
#[derive(Debug, Clone)]
pub struct CaptureLog {
    path: PathBuf,
}

impl CaptureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at the configured default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::capture_log_path()?))
    }

    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event to the log
    pub async fn append(&self, event: &CaptureEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open capture log: {}", self.path.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write event")?;
        file.flush().await.context("Failed to flush event")?;

        Ok(())
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<CaptureEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open capture log: {}", self.path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: CaptureEvent =
                serde_json::from_str(&line).with_context(|| format!("Failed to parse event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// Events belonging to one session
    pub async fn session_events(&self, session_id: Uuid) -> Result<Vec<CaptureEvent>> {
        let events = self.replay().await?;
        Ok(events.into_iter().filter(|e| e.session_id == session_id).collect())
    }

    /// Get the last event of a specific type
    pub async fn last_event_of_type(&self, event_type: CaptureEventType) -> Result<Option<CaptureEvent>> {
        let events = self.replay().await?;
        Ok(events.into_iter().rev().find(|e| e.event_type == event_type))
    }
}
