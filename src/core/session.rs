//! Capture session state machine.
//!
//! A `CaptureSession` runs as its own tokio task. The presentation layer
//! drives it through a cloneable `SessionHandle` (typed commands with oneshot
//! replies) and renders from the `SessionSnapshot` published on a watch
//! channel after every transition.
//!
//! ```text
//! idle → listening → transcribing → thinking → reviewing → idle
//!                                       └────→ chatting ──┘
//! ```
//!
//! At most one extraction or chat job is in flight. While thinking, the actor
//! selects between that job and incoming commands, so a cancel (or a newer
//! submission) drops the job immediately.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{ContactResolver, TaskStore};
use crate::config::CaptureSettings;
use crate::domain::{
    ActionKind, CaptureEvent, CaptureEventType, CapturedTask, ChatHistory, ChatMessage, CommitReport, DueHint,
    Phase, Priority, SessionSnapshot, TaskSource,
};
use crate::extract::{ConversationClassifier, DuplicateDetector, PatternExtractor};

use super::ai_client::{ChatReply, ResilientAiClient};
use super::capture_log::CaptureLog;

/// Command queue depth between handle and actor
const COMMAND_BUFFER: usize = 32;

/// Errors returned to callers of `SessionHandle` methods. They never change
/// session state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {command} while {phase:?}")]
    InvalidCommand { command: &'static str, phase: Phase },

    #[error("no pending candidate with id {0}")]
    UnknownCandidate(Uuid),

    #[error("input is empty")]
    EmptyInput,

    #[error("capture session has shut down")]
    SessionClosed,
}

/// Updates from a transcription source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptUpdate {
    /// Interim text, display only
    Partial(String),

    /// The speaker finished
    Finalized(String),

    /// Silence ended the utterance (handled exactly like `Finalized`)
    SilenceDetected(String),

    /// The user aborted recording
    Cancelled,

    /// The recognizer failed
    Error(String),
}

impl TranscriptUpdate {
    /// Whether this update ends the utterance
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Partial(_))
    }
}

/// Field changes applied to a pending candidate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateEdit {
    pub content: Option<String>,
    pub action_kind: Option<ActionKind>,
    pub contact_name: Option<String>,
    pub action_target: Option<String>,
    pub due_hint: Option<DueHint>,
    pub priority: Option<Priority>,
}

impl CandidateEdit {
    /// Whether the edit invalidates a previous contact resolution
    fn touches_contact(&self) -> bool {
        self.action_kind.is_some() || self.contact_name.is_some() || self.action_target.is_some()
    }
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    StartListening(Reply<()>),
    Transcript(TranscriptUpdate, Reply<()>),
    SubmitText(String, Reply<()>),
    Confirm(Uuid, Reply<CommitReport>),
    Discard(Uuid, Reply<()>),
    Edit(Uuid, CandidateEdit, Reply<CapturedTask>),
    CommitAll(Reply<CommitReport>),
    DiscardAll(Reply<()>),
    ExitChat(Reply<()>),
    Cancel(Reply<()>),
}

/// Cloneable front door to a running session
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that yields every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Voice input begins
    pub async fn start_listening(&self) -> Result<(), SessionError> {
        self.request(Command::StartListening).await
    }

    /// Feed one transcription update
    pub async fn submit_transcript(&self, update: TranscriptUpdate) -> Result<(), SessionError> {
        self.request(|reply| Command::Transcript(update, reply)).await
    }

    /// Submit typed text. Returns once processing has started; use
    /// `wait_until_settled` for the result.
    pub async fn submit_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::SubmitText(text, reply)).await
    }

    /// Resolve (if needed) and save one candidate
    pub async fn confirm_candidate(&self, id: Uuid) -> Result<CommitReport, SessionError> {
        self.request(|reply| Command::Confirm(id, reply)).await
    }

    /// Drop one candidate without saving it
    pub async fn discard_candidate(&self, id: Uuid) -> Result<(), SessionError> {
        self.request(|reply| Command::Discard(id, reply)).await
    }

    /// Change fields of a pending candidate; returns the updated candidate
    pub async fn edit_candidate(&self, id: Uuid, edit: CandidateEdit) -> Result<CapturedTask, SessionError> {
        self.request(|reply| Command::Edit(id, edit, reply)).await
    }

    /// Save every pending candidate in order
    pub async fn commit_all(&self) -> Result<CommitReport, SessionError> {
        self.request(Command::CommitAll).await
    }

    /// Drop every pending candidate
    pub async fn discard_all(&self) -> Result<(), SessionError> {
        self.request(Command::DiscardAll).await
    }

    /// Leave the conversation
    pub async fn exit_chat(&self) -> Result<(), SessionError> {
        self.request(Command::ExitChat).await
    }

    /// Abort whatever is happening and return to idle
    pub async fn cancel(&self) -> Result<(), SessionError> {
        self.request(Command::Cancel).await
    }

    /// Wait until no extraction or chat job is in flight
    pub async fn wait_until_settled(&self) -> Result<SessionSnapshot, SessionError> {
        let mut snapshots = self.snapshots.clone();
        let settled = snapshots
            .wait_for(|s| !matches!(s.phase, Phase::Transcribing | Phase::Thinking))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        Ok(settled.clone())
    }

    /// Forward a transcription stream into the session, stopping after the
    /// first terminal update.
    pub async fn pump_transcript<S>(&self, updates: S) -> Result<(), SessionError>
    where
        S: Stream<Item = TranscriptUpdate>,
    {
        tokio::pin!(updates);
        while let Some(update) = updates.next().await {
            let terminal = update.is_terminal();
            self.submit_transcript(update).await?;
            if terminal {
                break;
            }
        }
        Ok(())
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        response.await.map_err(|_| SessionError::SessionClosed)?
    }
}

/// What a finished job produced
enum Outcome {
    Review {
        candidates: Vec<CapturedTask>,
        source: TaskSource,
    },
    Chat {
        reply: ChatReply,
        conversational: bool,
    },
    Cancelled,
}

struct Job {
    text: String,
    started: Instant,
    token: CancellationToken,
    future: Pin<Box<dyn Future<Output = Outcome> + Send>>,
}

/// Everything a job needs, detached from the actor so it can run while the
/// actor keeps receiving commands.
#[derive(Clone)]
struct Pipeline {
    ai: Arc<ResilientAiClient>,
    resolver: Arc<dyn ContactResolver>,
    store: Arc<dyn TaskStore>,
    pattern: PatternExtractor,
    classifier: ConversationClassifier,
    duplicates: DuplicateDetector,
}

impl Pipeline {
    async fn think(self, text: String, history: Vec<ChatMessage>) -> Outcome {
        if let Some(task) = self.pattern.try_extract(&text) {
            debug!(action = %task.action_kind, "Pattern tier matched");
            let candidates = self.prepare(vec![task]).await;
            return Outcome::Review {
                candidates,
                source: TaskSource::Pattern,
            };
        }

        if self.classifier.is_conversational(&text) {
            let reply = self.ai.chat(&text, &history).await;
            return Outcome::Chat {
                reply,
                conversational: true,
            };
        }

        let extraction = self.ai.extract(&text, &history).await;
        if extraction.is_actionable() {
            let candidates = self.prepare(extraction.tasks).await;
            return Outcome::Review {
                candidates,
                source: extraction.source,
            };
        }

        debug!("Extraction found nothing actionable, replying instead");
        let reply = self.ai.chat(&text, &history).await;
        Outcome::Chat {
            reply,
            conversational: false,
        }
    }

    /// Contact resolution then the duplicate scan
    async fn prepare(&self, candidates: Vec<CapturedTask>) -> Vec<CapturedTask> {
        let open = self.open_tasks().await;
        let mut prepared = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let resolved = resolve_contact(self.resolver.as_ref(), candidate).await;
            prepared.push(self.duplicates.flag_duplicates(&resolved, &open));
        }
        prepared
    }

    async fn open_tasks(&self) -> Vec<String> {
        match self.store.open_tasks().await {
            Ok(open) => open,
            Err(e) => {
                warn!(error = %e, "Could not list open tasks, skipping duplicate scan");
                Vec::new()
            }
        }
    }
}

/// Apply the contact policy to one candidate: trust an existing target,
/// otherwise resolve the name, and flag it when an expected contact could not
/// be found.
async fn resolve_contact(resolver: &dyn ContactResolver, mut task: CapturedTask) -> CapturedTask {
    if task.has_target() {
        return task;
    }

    let expects_contact = task.action_kind.expects_contact();
    let name = match task.contact_name.clone().filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => {
            task.contact_unresolved = expects_contact;
            return task;
        }
    };

    match resolver.resolve(&name, task.action_kind).await {
        Ok(Some(contact)) => {
            debug!(kind = %task.action_kind, "Contact resolved");
            task.action_target = Some(contact.target);
            task.contact_name = Some(contact.canonical_name);
            task.contact_unresolved = false;
        }
        Ok(None) => {
            task.contact_unresolved = expects_contact;
        }
        Err(e) => {
            warn!(error = %e, "Contact resolution failed");
            task.contact_unresolved = expects_contact;
        }
    }
    task
}

enum Event {
    Command(Option<Command>),
    Finished(Outcome),
}

/// The session actor
pub struct CaptureSession {
    id: Uuid,
    pipeline: Pipeline,
    log: Option<CaptureLog>,
    phase: Phase,
    pending: Vec<CapturedTask>,
    resolved: HashSet<Uuid>,
    history: ChatHistory,
    interim: Option<String>,
    last_commit: Option<CommitReport>,
    job: Option<Job>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl CaptureSession {
    pub fn new(
        ai: Arc<ResilientAiClient>,
        resolver: Arc<dyn ContactResolver>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        let settings = CaptureSettings::default();
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        Self {
            id: Uuid::new_v4(),
            pipeline: Pipeline {
                ai,
                resolver,
                store,
                pattern: PatternExtractor::new(),
                classifier: ConversationClassifier::new(),
                duplicates: DuplicateDetector::new(settings.duplicate_threshold),
            },
            log: None,
            phase: Phase::Idle,
            pending: Vec::new(),
            resolved: HashSet::new(),
            history: ChatHistory::new(settings.chat_history_window),
            interim: None,
            last_commit: None,
            job: None,
            snapshots,
        }
    }

    /// Apply duplicate threshold and chat window
    pub fn with_settings(mut self, settings: &CaptureSettings) -> Self {
        self.pipeline.duplicates = DuplicateDetector::new(settings.duplicate_threshold);
        self.history = ChatHistory::new(settings.chat_history_window);
        self
    }

    /// Record session events to a capture log
    pub fn with_log(mut self, log: CaptureLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Start the actor on the current runtime
    pub fn spawn(self) -> SessionHandle {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle {
            id: self.id,
            commands,
            snapshots: self.snapshots.subscribe(),
        };
        info!(session = %self.id, "Capture session started");
        tokio::spawn(self.run(receiver));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let event = match self.job.as_mut() {
                Some(job) => tokio::select! {
                    command = commands.recv() => Event::Command(command),
                    outcome = &mut job.future => Event::Finished(outcome),
                },
                None => Event::Command(commands.recv().await),
            };

            match event {
                Event::Command(Some(command)) => self.handle(command).await,
                Event::Command(None) => break,
                Event::Finished(outcome) => self.finish_job(outcome).await,
            }
        }

        self.cancel_job();
        debug!(session = %self.id, "Capture session stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::StartListening(reply) => {
                let result = self.start_listening().await;
                let _ = reply.send(result);
            }
            Command::Transcript(update, reply) => {
                let result = self.transcript(update).await;
                let _ = reply.send(result);
            }
            Command::SubmitText(text, reply) => {
                let result = self.submit(text).await;
                let _ = reply.send(result);
            }
            Command::Confirm(id, reply) => {
                let result = self.confirm(id).await;
                let _ = reply.send(result);
            }
            Command::Discard(id, reply) => {
                let result = self.discard(id).await;
                let _ = reply.send(result);
            }
            Command::Edit(id, edit, reply) => {
                let result = self.edit(id, edit).await;
                let _ = reply.send(result);
            }
            Command::CommitAll(reply) => {
                let result = self.commit_all().await;
                let _ = reply.send(result);
            }
            Command::DiscardAll(reply) => {
                let result = self.discard_all().await;
                let _ = reply.send(result);
            }
            Command::ExitChat(reply) => {
                let result = self.exit_chat();
                let _ = reply.send(result);
            }
            Command::Cancel(reply) => {
                self.cancel().await;
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn invalid(&self, command: &'static str) -> SessionError {
        debug!(command, phase = ?self.phase, "Rejected command");
        SessionError::InvalidCommand {
            command,
            phase: self.phase,
        }
    }

    async fn start_listening(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Idle | Phase::Chatting => {
                self.interim = None;
                self.set_phase(Phase::Listening);
                Ok(())
            }
            Phase::Thinking => {
                self.interrupt("voice input started").await;
                self.interim = None;
                self.set_phase(Phase::Listening);
                Ok(())
            }
            _ => Err(self.invalid("start listening")),
        }
    }

    async fn transcript(&mut self, update: TranscriptUpdate) -> Result<(), SessionError> {
        match update {
            TranscriptUpdate::Partial(text) => match self.phase {
                Phase::Idle | Phase::Listening | Phase::Chatting | Phase::Thinking => {
                    if self.phase == Phase::Thinking {
                        self.interrupt("voice input started").await;
                    }
                    self.interim = Some(text);
                    self.set_phase(Phase::Listening);
                    Ok(())
                }
                _ => Err(self.invalid("accept partial transcript")),
            },
            TranscriptUpdate::Finalized(text) | TranscriptUpdate::SilenceDetected(text) => match self.phase {
                Phase::Idle | Phase::Listening | Phase::Chatting => {
                    self.interim = None;
                    if text.trim().is_empty() {
                        debug!("Empty transcript, nothing to process");
                        self.set_phase(self.resting_phase());
                        return Ok(());
                    }
                    self.begin_thinking(text).await;
                    Ok(())
                }
                // An empty transcript carries no new utterance; the job keeps running
                Phase::Thinking if text.trim().is_empty() => Ok(()),
                Phase::Thinking => {
                    self.interrupt("new utterance finalized").await;
                    self.begin_thinking(text).await;
                    Ok(())
                }
                _ => Err(self.invalid("finalize transcript")),
            },
            TranscriptUpdate::Cancelled => {
                self.cancel().await;
                Ok(())
            }
            TranscriptUpdate::Error(message) => {
                warn!(error = %message, "Transcription failed");
                if self.phase == Phase::Listening {
                    self.interim = None;
                    self.set_phase(self.resting_phase());
                }
                Ok(())
            }
        }
    }

    async fn submit(&mut self, text: String) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        match self.phase {
            Phase::Idle | Phase::Listening | Phase::Chatting => {
                self.interim = None;
                self.set_phase(Phase::Transcribing);
                self.begin_thinking(text).await;
                Ok(())
            }
            Phase::Thinking => {
                self.interrupt("new text submitted").await;
                self.begin_thinking(text).await;
                Ok(())
            }
            _ => Err(self.invalid("submit text")),
        }
    }

    async fn begin_thinking(&mut self, text: String) {
        self.cancel_job();
        let words = text.split_whitespace().count();
        self.record(CaptureEventType::InputSubmitted, format!("{} words", words), None)
            .await;
        debug!(text = %text, "Thinking");

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let pipeline = self.pipeline.clone();
        let history = self.history.messages();
        let input = text.clone();

        let future = Box::pin(async move {
            tokio::select! {
                _ = cancelled.cancelled() => Outcome::Cancelled,
                outcome = pipeline.think(input, history) => outcome,
            }
        });

        self.job = Some(Job {
            text,
            started: Instant::now(),
            token,
            future,
        });
        self.set_phase(Phase::Thinking);
    }

    /// Drop the in-flight job because a newer utterance replaces it
    async fn interrupt(&mut self, reason: &'static str) {
        if self.cancel_job() {
            info!(reason, "In-flight work cancelled by new input");
            self.record(CaptureEventType::Cancelled, reason.to_string(), None).await;
        }
    }

    /// Fire the job's token and drop its future. Returns whether a job was
    /// in flight.
    fn cancel_job(&mut self) -> bool {
        match self.job.take() {
            Some(job) => {
                job.token.cancel();
                true
            }
            None => false,
        }
    }

    async fn finish_job(&mut self, outcome: Outcome) {
        let Some(job) = self.job.take() else {
            return;
        };
        let elapsed_ms = job.started.elapsed().as_millis() as u64;

        match outcome {
            Outcome::Review { candidates, source } => {
                let event_type = if source == TaskSource::Pattern {
                    CaptureEventType::FastPathMatched
                } else {
                    CaptureEventType::Extracted
                };
                let summary = format!("{} via {}", candidates.len(), source);
                self.record(event_type, summary, Some(elapsed_ms)).await;

                self.resolved = candidates.iter().map(|c| c.id).collect();
                self.pending = candidates;
                info!(candidates = self.pending.len(), source = %source, "Candidates ready for review");
                self.record(CaptureEventType::CandidatesSurfaced, titles(&self.pending), None)
                    .await;
                self.set_phase(Phase::Reviewing);
            }
            Outcome::Chat { reply, conversational } => {
                let summary = if conversational {
                    format!("conversational, reply via {}", reply.source)
                } else {
                    format!("nothing actionable, reply via {}", reply.source)
                };
                self.record(CaptureEventType::RoutedToChat, summary, Some(elapsed_ms))
                    .await;

                self.history.push(ChatMessage::user(job.text));
                self.history.push(ChatMessage::assistant(reply.text));
                self.set_phase(Phase::Chatting);
            }
            Outcome::Cancelled => {
                debug!("Job finished after cancellation, ignoring");
            }
        }
    }

    fn pending_index(&self, id: Uuid) -> Result<usize, SessionError> {
        self.pending
            .iter()
            .position(|c| c.id == id)
            .ok_or(SessionError::UnknownCandidate(id))
    }

    async fn confirm(&mut self, id: Uuid) -> Result<CommitReport, SessionError> {
        if self.phase != Phase::Reviewing {
            return Err(self.invalid("confirm candidate"));
        }
        let index = self.pending_index(id)?;
        let candidate = self.pending.remove(index);

        let report = self.persist(vec![candidate]).await;
        if self.pending.is_empty() {
            self.go_idle();
        } else {
            self.publish();
        }
        Ok(report)
    }

    async fn discard(&mut self, id: Uuid) -> Result<(), SessionError> {
        if self.phase != Phase::Reviewing {
            return Err(self.invalid("discard candidate"));
        }
        let index = self.pending_index(id)?;
        let discarded = self.pending.remove(index);
        self.resolved.remove(&id);
        self.record(CaptureEventType::Discarded, discarded.content, None).await;

        if self.pending.is_empty() {
            self.go_idle();
        } else {
            self.publish();
        }
        Ok(())
    }

    async fn edit(&mut self, id: Uuid, edit: CandidateEdit) -> Result<CapturedTask, SessionError> {
        if self.phase != Phase::Reviewing {
            return Err(self.invalid("edit candidate"));
        }
        if edit.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(SessionError::EmptyInput);
        }
        let index = self.pending_index(id)?;

        if edit.touches_contact() {
            self.resolved.remove(&id);
        }

        let content_changed = edit.content.is_some();
        let candidate = &mut self.pending[index];
        if let Some(content) = edit.content {
            candidate.content = content.trim().to_string();
        }
        if let Some(kind) = edit.action_kind {
            candidate.action_kind = kind;
        }
        if let Some(name) = edit.contact_name {
            candidate.contact_name = Some(name).filter(|n| !n.trim().is_empty());
            candidate.action_target = None;
        }
        if let Some(target) = edit.action_target {
            candidate.action_target = Some(target).filter(|t| !t.trim().is_empty());
        }
        if let Some(due) = edit.due_hint {
            candidate.due_hint = due;
        }
        if let Some(priority) = edit.priority {
            candidate.priority = priority;
        }
        if candidate.has_target() {
            candidate.contact_unresolved = false;
        }

        if content_changed {
            let open = self.pipeline.open_tasks().await;
            let rescanned = self.pipeline.duplicates.flag_duplicates(&self.pending[index], &open);
            self.pending[index] = rescanned;
        }

        let updated = self.pending[index].clone();
        self.publish();
        Ok(updated)
    }

    async fn commit_all(&mut self) -> Result<CommitReport, SessionError> {
        if self.phase != Phase::Reviewing {
            return Err(self.invalid("commit"));
        }
        let candidates = std::mem::take(&mut self.pending);
        let report = self.persist(candidates).await;
        self.go_idle();
        Ok(report)
    }

    async fn discard_all(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Reviewing {
            return Err(self.invalid("discard"));
        }
        let count = self.pending.len();
        self.record(CaptureEventType::Discarded, format!("{} candidates", count), None)
            .await;
        self.go_idle();
        Ok(())
    }

    fn exit_chat(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Chatting {
            return Err(self.invalid("exit chat"));
        }
        self.go_idle();
        Ok(())
    }

    async fn cancel(&mut self) {
        let had_job = self.cancel_job();
        if had_job || self.phase != Phase::Idle {
            info!(phase = ?self.phase, in_flight = had_job, "Session cancelled");
            let summary = format!("from {:?}", self.phase);
            self.record(CaptureEventType::Cancelled, summary, None).await;
        }
        self.go_idle();
    }

    /// Resolve anything not yet resolved, then hand each task to the store in
    /// order. Failures are reported, not retried.
    async fn persist(&mut self, candidates: Vec<CapturedTask>) -> CommitReport {
        let mut report = CommitReport::default();

        for candidate in candidates {
            let task = if self.resolved.remove(&candidate.id) {
                candidate
            } else {
                resolve_contact(self.pipeline.resolver.as_ref(), candidate).await
            };

            match self.pipeline.store.persist(&task).await {
                Ok(()) => {
                    info!(task = %task.id, "Task committed");
                    self.record(CaptureEventType::Committed, task.content.clone(), None)
                        .await;
                    report.saved.push(task.id);
                }
                Err(e) => {
                    warn!(task = %task.id, error = %e, "Task store rejected task");
                    let event = CaptureEvent::new(self.id, CaptureEventType::CommitFailed, task.content.clone())
                        .with_error(e.to_string());
                    append_event(self.log.as_ref(), event).await;
                    report.failed.push((task.id, e.to_string()));
                }
            }
        }

        self.last_commit = Some(report.clone());
        report
    }

    /// Chatting keeps its conversation; everything else rests in idle
    fn resting_phase(&self) -> Phase {
        if self.history.is_empty() {
            Phase::Idle
        } else {
            Phase::Chatting
        }
    }

    fn go_idle(&mut self) {
        self.pending.clear();
        self.resolved.clear();
        self.history.clear();
        self.interim = None;
        self.set_phase(Phase::Idle);
    }

    /// Log an event if a capture log is attached
    async fn record(&mut self, event_type: CaptureEventType, summary: String, duration_ms: Option<u64>) {
        let mut event = CaptureEvent::new(self.id, event_type, summary);
        event.duration_ms = duration_ms;
        append_event(self.log.as_ref(), event).await;
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Phase transition");
        }
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(SessionSnapshot {
            phase: self.phase,
            pending_candidates: self.pending.clone(),
            chat_history: self.history.messages(),
            interim_transcript: self.interim.clone(),
            last_commit: self.last_commit.clone(),
        });
    }

}

async fn append_event(log: Option<&CaptureLog>, event: CaptureEvent) {
    if let Some(log) = log {
        if let Err(e) = log.append(&event).await {
            warn!(error = %e, "Failed to write capture log");
        }
    }
}

fn titles(candidates: &[CapturedTask]) -> String {
    candidates
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
