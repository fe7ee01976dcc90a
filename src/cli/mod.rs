//! Command-line interface for nudge.
//!
//! Provides one-shot capture, an interactive capture loop, an offline
//! classifier for debugging routing, task listing, the capture log and
//! config inspection.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::adapters::task_store::StoredStatus;
use crate::adapters::{DirectoryResolver, JsonlTaskStore};
use crate::config;
use crate::core::{CaptureLog, CaptureSession, ResilientAiClient, SessionHandle};
use crate::domain::{
    ActionKind, CaptureEventType, CapturedTask, CommitReport, DueHint, Phase, SessionSnapshot,
};
use crate::extract::{Classification, ConversationClassifier, PatternExtractor};

/// nudge - Turn loose thoughts into tasks
#[derive(Parser, Debug)]
#[command(name = "nudge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture tasks from one utterance
    Capture {
        /// What's on your mind
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Save every candidate without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Interactive capture loop
    Repl,

    /// Show how an utterance would be routed (no AI calls)
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List saved tasks
    Tasks {
        /// Maximum number of tasks to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the capture log
    Log {
        /// Only events from this session
        #[arg(short, long)]
        session: Option<Uuid>,

        /// Maximum number of events to show
        #[arg(short, long, default_value = "30")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Capture { text, yes } => capture(&text.join(" "), yes).await,
            Commands::Repl => repl().await,
            Commands::Classify { text } => {
                classify(&text.join(" "));
                Ok(())
            }
            Commands::Tasks { limit } => list_tasks(limit).await,
            Commands::Log { session, limit } => show_log(session, limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Wire a session to the configured providers, contacts, store and log
fn start_session() -> Result<SessionHandle> {
    let cfg = config::config()?;

    let ai = Arc::new(ResilientAiClient::from_config(cfg));
    let resolver = Arc::new(DirectoryResolver::load(&cfg.contacts)?);
    let store = Arc::new(JsonlTaskStore::new(cfg.tasks.clone()));

    let session = CaptureSession::new(ai, resolver, store)
        .with_settings(&cfg.capture)
        .with_log(CaptureLog::new(cfg.capture_log.clone()));

    Ok(session.spawn())
}

/// One-shot capture
async fn capture(text: &str, yes: bool) -> Result<()> {
    let session = start_session()?;

    session.submit_text(text).await?;
    let snapshot = session.wait_until_settled().await?;

    match snapshot.phase {
        Phase::Reviewing => {
            print_candidates(&snapshot.pending_candidates);

            let save = yes || confirm(&format!("Save {} task(s)? [Y/n] ", snapshot.pending_candidates.len())).await?;
            if save {
                let report = session.commit_all().await?;
                print_report(&report);
            } else {
                session.discard_all().await?;
                println!("Discarded");
            }
        }
        Phase::Chatting => print_reply(&snapshot),
        other => println!("Nothing captured ({:?})", other),
    }

    Ok(())
}

/// Interactive loop: type thoughts, then answer the review prompt
async fn repl() -> Result<()> {
    let session = start_session()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("nudge - type a thought, :q to quit, :cancel to start over");
    prompt(Phase::Idle);

    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let line = line.trim();
        if line.is_empty() {
            prompt(session.snapshot().phase);
            continue;
        }

        match line {
            ":q" | ":quit" | "exit" => break,
            ":cancel" => {
                session.cancel().await?;
            }
            _ => handle_line(&session, line).await?,
        }

        prompt(session.snapshot().phase);
    }

    Ok(())
}

async fn handle_line(session: &SessionHandle, line: &str) -> Result<()> {
    let snapshot = session.snapshot();

    match snapshot.phase {
        Phase::Reviewing => review_command(session, &snapshot, line).await?,
        Phase::Chatting if line == ":done" => {
            session.exit_chat().await?;
        }
        _ => {
            session.submit_text(line).await?;
            let settled = session.wait_until_settled().await?;
            match settled.phase {
                Phase::Reviewing => print_candidates(&settled.pending_candidates),
                Phase::Chatting => print_reply(&settled),
                _ => {}
            }
        }
    }

    Ok(())
}

/// Review commands: y (save all), n (discard all), s <n> (save one),
/// d <n> (discard one)
async fn review_command(session: &SessionHandle, snapshot: &SessionSnapshot, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let pick = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| snapshot.pending_candidates.get(i));

    match (verb, pick) {
        ("y" | "yes", _) => print_report(&session.commit_all().await?),
        ("n" | "no", _) => {
            session.discard_all().await?;
            println!("Discarded");
        }
        ("s", Some(task)) => print_report(&session.confirm_candidate(task.id).await?),
        ("d", Some(task)) => {
            session.discard_candidate(task.id).await?;
            println!("Removed \"{}\"", task.content);
        }
        _ => println!("y = save all, n = discard all, s <n> = save one, d <n> = discard one"),
    }

    let after = session.snapshot();
    if after.phase == Phase::Reviewing {
        print_candidates(&after.pending_candidates);
    }

    Ok(())
}

/// Offline routing preview
fn classify(text: &str) {
    match PatternExtractor::new().try_extract(text) {
        Some(task) => {
            println!("Route:   fast path (pattern)");
            print_candidates(&[task]);
        }
        None => match ConversationClassifier::new().classify(text) {
            Classification::Conversational => println!("Route:   chat (conversational)"),
            Classification::Ambiguous => println!("Route:   AI extraction (ambiguous)"),
        },
    }
}

/// List saved tasks, newest first
async fn list_tasks(limit: usize) -> Result<()> {
    let store = JsonlTaskStore::open_default()?;
    let tasks = store.list().await?;

    if tasks.is_empty() {
        println!("No tasks saved yet");
        return Ok(());
    }

    println!("{:<20} {:<8} {:<10} {:<10} {}", "COMMITTED", "STATUS", "ACTION", "DUE", "TASK");
    println!("{}", "-".repeat(80));

    for stored in tasks.iter().rev().take(limit) {
        let status = match stored.status {
            StoredStatus::Open => "open",
            StoredStatus::Done => "done",
        };
        println!(
            "{:<20} {:<8} {:<10} {:<10} {}",
            stored.committed_at.format("%Y-%m-%d %H:%M"),
            status,
            stored.task.action_kind.to_string(),
            stored.task.due_hint.to_string(),
            stored.task.content
        );
    }

    Ok(())
}

/// Print capture log events, oldest first
async fn show_log(session: Option<Uuid>, limit: usize) -> Result<()> {
    let log = CaptureLog::open_default()?;
    let events = match session {
        Some(id) => log.session_events(id).await?,
        None => log.replay().await?,
    };

    if events.is_empty() {
        println!("No capture events in {}", log.path().display());
        return Ok(());
    }

    println!("{:<20} {:<10} {:<20} {}", "TIME", "SESSION", "EVENT", "SUMMARY");
    println!("{}", "-".repeat(80));

    let skip = events.len().saturating_sub(limit);
    for event in events.iter().skip(skip) {
        let session = event.session_id.to_string();
        let mut summary = event.summary.clone();
        if let Some(ms) = event.duration_ms {
            summary.push_str(&format!(" ({}ms)", ms));
        }
        if let Some(error) = &event.error {
            summary.push_str(&format!(" [{}]", error));
        }
        println!(
            "{:<20} {:<10} {:<20} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            &session[..8],
            format!("{:?}", event.event_type),
            summary
        );
    }

    if let Some(last) = log.last_event_of_type(CaptureEventType::Committed).await? {
        println!();
        println!("Last commit: {} ({})", last.timestamp.format("%Y-%m-%d %H:%M"), last.summary);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("nudge configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", cfg.home.display());
    println!("  Tasks:       {}", cfg.tasks.display());
    println!("  Contacts:    {}", cfg.contacts.display());
    println!("  Capture log: {}", cfg.capture_log.display());
    println!();
    println!("Providers:");
    println!(
        "  Remote: {} @ {} ({})",
        cfg.remote.model,
        cfg.remote.base_url,
        if cfg.remote.api_key.is_some() { "key set" } else { "no key" }
    );
    println!(
        "  Local:  {} @ {} ({})",
        cfg.local.model,
        cfg.local.base_url,
        if cfg.local.enabled { "enabled" } else { "disabled" }
    );
    println!();
    println!("Resilience:");
    println!(
        "  Timeouts:  first response {}ms, attempt {}ms, retry after {}ms",
        cfg.resilience.first_response_timeout_ms, cfg.resilience.attempt_timeout_ms, cfg.resilience.retry_backoff_ms
    );
    println!(
        "  Circuit:   {} failures in {}s opens for {}s",
        cfg.resilience.failure_threshold,
        cfg.resilience.failure_window_seconds,
        cfg.resilience.circuit_cooldown_seconds
    );
    println!("  Deadline:  {}s", cfg.resilience.chain_deadline_seconds);
    println!();
    println!("Capture:");
    println!("  Duplicate threshold: {}", cfg.capture.duplicate_threshold);
    println!("  Chat history window: {}", cfg.capture.chat_history_window);
    println!("  Max candidates:      {}", cfg.capture.max_candidates);

    Ok(())
}

fn print_candidates(candidates: &[CapturedTask]) {
    for (i, task) in candidates.iter().enumerate() {
        match &task.emoji {
            Some(emoji) => println!("  {}. {} {}", i + 1, emoji, task.content),
            None => println!("  {}. {}", i + 1, task.content),
        }

        let mut details = vec![format!("priority {}", task.priority)];
        if task.action_kind != ActionKind::None {
            details.push(format!("action {}", task.action_kind));
        }
        if let Some(target) = &task.action_target {
            details.push(format!("-> {}", target));
        }
        if task.due_hint != DueHint::None {
            details.push(format!("due {}", task.due_hint));
        }
        if task.contact_unresolved {
            details.push("contact not found".to_string());
        }
        if task.possible_duplicate {
            details.push("possible duplicate".to_string());
        }
        println!("     {}", details.join(", "));
    }
}

fn print_report(report: &CommitReport) {
    if !report.saved.is_empty() {
        println!("Saved {} task(s)", report.saved.len());
    }
    for (id, error) in &report.failed {
        println!("Failed to save {}: {}", id, error);
    }
}

fn print_reply(snapshot: &SessionSnapshot) {
    if let Some(reply) = snapshot.last_reply() {
        println!("{}", reply);
    }
}

fn prompt(phase: Phase) {
    use std::io::Write;

    let marker = match phase {
        Phase::Reviewing => "review> ",
        Phase::Chatting => "chat> ",
        _ => "> ",
    };
    print!("{}", marker);
    let _ = std::io::stdout().flush();
}

async fn confirm(question: &str) -> Result<bool> {
    use std::io::Write;

    print!("{}", question);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await.context("Failed to read from stdin")?;
    Ok(matches!(
        answer.as_deref().map(|a| a.trim().to_ascii_lowercase()).as_deref(),
        None | Some("") | Some("y") | Some("yes")
    ))
}
