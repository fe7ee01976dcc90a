//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use nudge::adapters::{
    AiProvider, CallBudget, ContactResolver, ProviderError, ProviderRequest, ResolvedContact, TaskStore,
};
use nudge::config::ResilienceSettings;
use nudge::core::{CaptureSession, ResilientAiClient, SessionHandle};
use nudge::domain::{ActionKind, CapturedTask, TaskSource};
use nudge::extract::RawTask;

/// How a scripted provider answers
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer immediately
    Succeed { tasks: Vec<RawTask>, reply: String },

    /// Fail immediately
    Fail(ProviderError),

    /// Never send headers: report a first-response timeout once it elapses
    TimeOut,

    /// Never answer at all
    Hang,
}

impl Behavior {
    pub fn tasks(contents: &[&str]) -> Self {
        Self::Succeed {
            tasks: contents.iter().map(|c| raw(c)).collect(),
            reply: "Sounds good!".to_string(),
        }
    }

    pub fn reply(text: &str) -> Self {
        Self::Succeed {
            tasks: Vec::new(),
            reply: text.to_string(),
        }
    }

    pub fn transport_error() -> Self {
        Self::Fail(ProviderError::Transport("connection refused".to_string()))
    }
}

/// Provider that follows a `Behavior` and counts every call
pub struct SpyProvider {
    name: &'static str,
    tier: TaskSource,
    available: bool,
    behavior: Mutex<Behavior>,
    extract_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    in_flight: AtomicUsize,
    dropped: AtomicUsize,
}

/// Tracks one provider call; a call dropped before it returns counts as
/// cancelled
struct CallGuard<'a> {
    spy: &'a SpyProvider,
    returned: bool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.spy.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !self.returned {
            self.spy.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl SpyProvider {
    pub fn new(name: &'static str, tier: TaskSource, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            tier,
            available: true,
            behavior: Mutex::new(behavior),
            extract_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn remote(behavior: Behavior) -> Arc<Self> {
        Self::new("remote", TaskSource::Remote, behavior)
    }

    pub fn local(behavior: Behavior) -> Arc<Self> {
        Self::new("local", TaskSource::Local, behavior)
    }

    pub fn unavailable(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            tier: TaskSource::Remote,
            available: false,
            behavior: Mutex::new(Behavior::tasks(&["should never appear"])),
            extract_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.extract_calls() + self.chat_calls()
    }

    /// Calls currently awaiting a response
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Calls whose future was dropped before it returned
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Yield until at least one call is in flight
    pub async fn wait_for_call(&self) {
        while self.in_flight() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    async fn respond(&self, budget: CallBudget) -> Result<(Vec<RawTask>, String), ProviderError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let mut guard = CallGuard {
            spy: self,
            returned: false,
        };
        let result = self.answer(budget).await;
        guard.returned = true;
        result
    }

    async fn answer(&self, budget: CallBudget) -> Result<(Vec<RawTask>, String), ProviderError> {
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Succeed { tasks, reply } => Ok((tasks, reply)),
            Behavior::Fail(error) => Err(error),
            Behavior::TimeOut => {
                tokio::time::sleep(budget.first_response).await;
                Err(ProviderError::first_response_timeout(budget))
            }
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AiProvider for SpyProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn tier(&self) -> TaskSource {
        self.tier
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn extract(
        &self,
        _request: &ProviderRequest,
        budget: CallBudget,
    ) -> Result<Vec<RawTask>, ProviderError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(budget).await.map(|(tasks, _)| tasks)
    }

    async fn chat(&self, _request: &ProviderRequest, budget: CallBudget) -> Result<String, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(budget).await.map(|(_, reply)| reply)
    }
}

/// Model output with only content set
pub fn raw(content: &str) -> RawTask {
    RawTask {
        content: Some(content.to_string()),
        ..Default::default()
    }
}

/// Client over the given providers with default resilience settings
pub fn client(providers: Vec<Arc<SpyProvider>>) -> Arc<ResilientAiClient> {
    let providers: Vec<Arc<dyn AiProvider>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn AiProvider>)
        .collect();
    Arc::new(ResilientAiClient::new(providers, ResilienceSettings::default()))
}

/// In-memory task store
#[derive(Default)]
pub struct MemoryStore {
    open: Vec<String>,
    reject: Option<String>,
    saved: Mutex<Vec<CapturedTask>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_open(open: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            open: open.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    /// Store that refuses any task whose content equals `content`
    pub fn rejecting(content: &str) -> Arc<Self> {
        Arc::new(Self {
            reject: Some(content.to_string()),
            ..Default::default()
        })
    }

    pub fn saved(&self) -> Vec<CapturedTask> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn open_tasks(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.open.clone())
    }

    async fn persist(&self, task: &CapturedTask) -> anyhow::Result<()> {
        if self.reject.as_deref() == Some(task.content.as_str()) {
            anyhow::bail!("disk full");
        }
        self.saved.lock().unwrap().push(task.clone());
        Ok(())
    }
}

/// Resolver backed by a fixed name → (target, canonical name) table
#[derive(Default)]
pub struct TableResolver {
    entries: HashMap<String, ResolvedContact>,
    calls: AtomicUsize,
}

impl TableResolver {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(entries: &[(&str, &str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            entries: entries
                .iter()
                .map(|(name, target, canonical)| {
                    (
                        name.to_string(),
                        ResolvedContact {
                            target: target.to_string(),
                            canonical_name: canonical.to_string(),
                        },
                    )
                })
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactResolver for TableResolver {
    async fn resolve(&self, name: &str, _kind: ActionKind) -> anyhow::Result<Option<ResolvedContact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.get(&name.to_lowercase()).cloned())
    }
}

/// Spawn a session over the given collaborators
pub fn spawn_session(
    ai: Arc<ResilientAiClient>,
    resolver: Arc<TableResolver>,
    store: Arc<MemoryStore>,
) -> SessionHandle {
    CaptureSession::new(ai, resolver, store).spawn()
}
