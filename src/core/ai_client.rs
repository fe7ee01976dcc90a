//! Resilient AI client.
//!
//! Wraps an ordered list of provider tiers (remote, then local) with
//! per-attempt timeouts, a single retry and a circuit breaker per tier. When
//! every provider tier fails, or the whole chain runs past its deadline, the
//! deterministic keyword tier answers. Callers never see a provider error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{AiProvider, CallBudget, OllamaProvider, OpenAiProvider, ProviderError, ProviderRequest};
use crate::config::{ResilienceSettings, ResolvedConfig};
use crate::domain::{CapturedTask, ChatMessage, TaskSource};
use crate::extract::mapping::MAX_CANDIDATES;
use crate::extract::{curated_reply, to_candidates, KeywordExtractor};

use super::resilience::{Admission, CircuitPolicy, FailureOutcome, ProviderHealth, RetryState};

/// Candidates produced for one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Candidates in utterance order
    pub tasks: Vec<CapturedTask>,

    /// Tier that produced them
    pub source: TaskSource,
}

impl Extraction {
    /// Whether the utterance contained anything worth reviewing
    pub fn is_actionable(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// A conversational reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub source: TaskSource,
}

struct Tier {
    provider: Arc<dyn AiProvider>,
    state: Mutex<RetryState>,
}

impl Tier {
    fn state(&self) -> MutexGuard<'_, RetryState> {
        // A panic while holding the lock cannot leave the counters inconsistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Provider chain shared by every session in the process
pub struct ResilientAiClient {
    tiers: Vec<Tier>,
    keyword: KeywordExtractor,
    settings: ResilienceSettings,
    max_candidates: usize,
    calls: AtomicU64,
}

impl ResilientAiClient {
    /// Build a client over `providers`, tried in order
    pub fn new(providers: Vec<Arc<dyn AiProvider>>, settings: ResilienceSettings) -> Self {
        let policy = CircuitPolicy::from(&settings);
        let tiers = providers
            .into_iter()
            .map(|provider| Tier {
                provider,
                state: Mutex::new(RetryState::new(policy)),
            })
            .collect();

        Self {
            tiers,
            keyword: KeywordExtractor::new(),
            settings,
            max_candidates: MAX_CANDIDATES,
            calls: AtomicU64::new(0),
        }
    }

    /// Cap the number of candidates surfaced per utterance
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max.max(1);
        self
    }

    /// Remote tier then local tier, as configured
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let providers: Vec<Arc<dyn AiProvider>> = vec![
            Arc::new(OpenAiProvider::from_settings(&config.remote)),
            Arc::new(OllamaProvider::from_settings(&config.local)),
        ];
        Self::new(providers, config.resilience.clone()).with_max_candidates(config.capture.max_candidates)
    }

    /// Number of extract/chat requests served so far
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Breaker state of each provider tier, in chain order
    pub fn provider_health(&self) -> Vec<ProviderHealth> {
        let now = Instant::now();
        self.tiers
            .iter()
            .map(|tier| {
                let state = tier.state();
                ProviderHealth {
                    name: tier.provider.name().to_string(),
                    available: tier.provider.is_available(),
                    state: state.state(now),
                    consecutive_failures: state.consecutive_failures,
                    last_error: state.last_error.clone(),
                }
            })
            .collect()
    }

    /// Extract candidate tasks from an utterance
    #[instrument(skip_all, fields(chars = text.len()))]
    pub async fn extract(&self, text: &str, history: &[ChatMessage]) -> Extraction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = ProviderRequest::new(text).with_history(history.to_vec());

        match self.extract_via_providers(&request, self.deadline()).await {
            Some(extraction) => extraction,
            None => {
                info!("No provider tier answered, using keyword extraction");
                self.keyword_extraction(text)
            }
        }
    }

    /// Produce a conversational reply
    #[instrument(skip_all, fields(chars = text.len()))]
    pub async fn chat(&self, text: &str, history: &[ChatMessage]) -> ChatReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = ProviderRequest::new(text).with_history(history.to_vec());

        match self.chat_via_providers(&request, self.deadline()).await {
            Some(reply) => reply,
            None => {
                info!("No provider tier answered, using curated reply");
                ChatReply {
                    text: curated_reply(text),
                    source: TaskSource::Keyword,
                }
            }
        }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.chain_deadline_for(self.tiers.len())
    }

    fn keyword_extraction(&self, text: &str) -> Extraction {
        Extraction {
            tasks: vec![self.keyword.extract(text)],
            source: TaskSource::Keyword,
        }
    }

    async fn extract_via_providers(&self, request: &ProviderRequest, deadline: Instant) -> Option<Extraction> {
        for tier in &self.tiers {
            if let Some(raws) = self
                .call_tier(tier, deadline, |p, budget| p.extract(request, budget))
                .await
            {
                let source = tier.provider.tier();
                let tasks = to_candidates(&raws, source, request.today, self.max_candidates);
                info!(provider = tier.provider.name(), candidates = tasks.len(), "Extraction complete");
                return Some(Extraction { tasks, source });
            }
        }
        None
    }

    async fn chat_via_providers(&self, request: &ProviderRequest, deadline: Instant) -> Option<ChatReply> {
        for tier in &self.tiers {
            if let Some(text) = self
                .call_tier(tier, deadline, |p, budget| p.chat(request, budget))
                .await
            {
                info!(provider = tier.provider.name(), "Chat reply received");
                return Some(ChatReply {
                    text,
                    source: tier.provider.tier(),
                });
            }
        }
        None
    }

    /// One tier: circuit check, first attempt, one retry after the backoff,
    /// then breaker bookkeeping. `None` means fall through to the next tier.
    /// No attempt runs past `deadline`; an attempt cut short by it counts as
    /// a failed attempt.
    async fn call_tier<'a, T, F>(&self, tier: &'a Tier, deadline: Instant, op: F) -> Option<T>
    where
        F: Fn(&'a dyn AiProvider, CallBudget) -> BoxFuture<'a, Result<T, ProviderError>>,
    {
        let name = tier.provider.name();

        if !tier.provider.is_available() {
            debug!(provider = name, "Provider unavailable, skipping");
            return None;
        }

        if Instant::now() >= deadline {
            warn!(provider = name, "Chain deadline reached, skipping provider");
            return None;
        }

        let admission = tier.state().admit(Instant::now());
        let Some(admission) = admission else {
            debug!(provider = name, "Circuit open, skipping provider");
            return None;
        };
        if admission == Admission::Trial {
            info!(provider = name, "Circuit half-open, sending trial call");
        }
        let mut trial = TrialGuard {
            tier,
            armed: admission == Admission::Trial,
        };

        let budget = self.settings.call_budget();
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=2u32 {
            if attempt > 1 {
                sleep(self.settings.retry_backoff()).await;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let limit = budget.overall.min(remaining);

            let result = match timeout(limit, op(tier.provider.as_ref(), budget)).await {
                Ok(result) => result,
                Err(_) if limit < budget.overall => Err(ProviderError::Timeout {
                    stage: "chain deadline",
                    after_ms: limit.as_millis() as u64,
                }),
                Err(_) => Err(ProviderError::overall_timeout(budget)),
            };

            match result {
                Ok(value) => {
                    trial.armed = false;
                    tier.state().record_success();
                    if admission == Admission::Trial {
                        info!(provider = name, "Circuit closed");
                    }
                    return Some(value);
                }
                Err(e) => {
                    warn!(provider = name, attempt, error = %e, "Provider attempt failed");
                    last_error = Some(e);
                }
            }
        }

        trial.armed = false;
        let message = last_error.map(|e| e.to_string()).unwrap_or_default();
        let outcome = tier.state().record_failure(Instant::now(), message);
        match outcome {
            FailureOutcome::Opened => warn!(provider = name, "Circuit opened"),
            FailureOutcome::Counted(failures) => debug!(provider = name, failures, "Provider failure recorded"),
        }

        None
    }
}

/// Releases a half-open trial slot when the call is dropped before it
/// settles (session cancelled, caller timed out)
struct TrialGuard<'a> {
    tier: &'a Tier,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.tier.state().abandon_trial();
        }
    }
}
