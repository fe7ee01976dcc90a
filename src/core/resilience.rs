//! Failure tracking and circuit breaking for AI provider tiers.
//!
//! Each provider tier owns one `RetryState`. A tier that keeps failing is
//! taken out of rotation for a cooldown period so callers fall through to
//! the next tier without paying for doomed network calls.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::ResilienceSettings;

/// Breaker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitPolicy {
    /// Failed calls before the circuit opens
    pub failure_threshold: u32,

    /// Failures older than this no longer count
    pub failure_window: Duration,

    /// How long an open circuit rejects calls
    pub cooldown: Duration,
}

impl Default for CircuitPolicy {
    fn default() -> Self {
        Self::from(&ResilienceSettings::default())
    }
}

impl From<&ResilienceSettings> for CircuitPolicy {
    fn from(settings: &ResilienceSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold.max(1),
            failure_window: settings.failure_window(),
            cooldown: settings.circuit_cooldown(),
        }
    }
}

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally
    Closed,

    /// Calls are rejected without I/O
    Open { remaining: Duration },

    /// Cooldown elapsed; the next call is a trial
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open { remaining } => write!(f, "open ({}s left)", remaining.as_secs()),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// What happened when a failure was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still below the threshold
    Counted(u32),

    /// The circuit just opened
    Opened,
}

/// How a call was let through the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed
    Normal,

    /// The single call allowed once the cooldown has expired
    Trial,
}

/// Per-provider failure bookkeeping
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: CircuitPolicy,

    /// Failed calls inside the current window
    pub consecutive_failures: u32,

    /// Start of the rolling failure window
    pub window_started: Option<Instant>,

    /// Calls are rejected until this instant
    pub circuit_open_until: Option<Instant>,

    /// Most recent failure message
    pub last_error: Option<String>,

    /// A half-open trial call is out and has not settled
    pub trial_in_flight: bool,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(CircuitPolicy::default())
    }
}

impl RetryState {
    pub fn new(policy: CircuitPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            window_started: None,
            circuit_open_until: None,
            last_error: None,
            trial_in_flight: false,
        }
    }

    pub fn policy(&self) -> CircuitPolicy {
        self.policy
    }

    /// Current state as seen at `now`
    pub fn state(&self, now: Instant) -> CircuitState {
        match self.circuit_open_until {
            Some(until) if now < until => CircuitState::Open {
                remaining: until - now,
            },
            Some(_) => CircuitState::HalfOpen,
            None => CircuitState::Closed,
        }
    }

    /// Whether a call arriving at `now` would be admitted
    pub fn allows_call(&self, now: Instant) -> bool {
        match self.state(now) {
            CircuitState::Closed => true,
            CircuitState::Open { .. } => false,
            CircuitState::HalfOpen => !self.trial_in_flight,
        }
    }

    /// Admit a call at `now`, or `None` while the circuit is open. Once the
    /// cooldown has expired exactly one trial is admitted; everyone else is
    /// turned away until it settles.
    pub fn admit(&mut self, now: Instant) -> Option<Admission> {
        match self.state(now) {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::Open { .. } => None,
            CircuitState::HalfOpen if self.trial_in_flight => None,
            CircuitState::HalfOpen => {
                self.trial_in_flight = true;
                Some(Admission::Trial)
            }
        }
    }

    /// The trial call went away without a result; the next caller may try
    pub fn abandon_trial(&mut self) {
        self.trial_in_flight = false;
    }

    /// A call succeeded: forget all failures and close the circuit
    pub fn record_success(&mut self) {
        self.trial_in_flight = false;
        self.consecutive_failures = 0;
        self.window_started = None;
        self.circuit_open_until = None;
        self.last_error = None;
    }

    /// A call failed after its retry
    pub fn record_failure(&mut self, now: Instant, error: impl Into<String>) -> FailureOutcome {
        self.last_error = Some(error.into());
        self.trial_in_flight = false;

        // A failed trial call reopens immediately
        if self.state(now) == CircuitState::HalfOpen {
            self.open(now);
            return FailureOutcome::Opened;
        }

        let window_expired = self
            .window_started
            .map_or(true, |started| now.duration_since(started) > self.policy.failure_window);
        if window_expired {
            self.consecutive_failures = 0;
            self.window_started = Some(now);
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.policy.failure_threshold {
            self.open(now);
            FailureOutcome::Opened
        } else {
            FailureOutcome::Counted(self.consecutive_failures)
        }
    }

    fn open(&mut self, now: Instant) {
        self.circuit_open_until = Some(now + self.policy.cooldown);
        self.window_started = None;
    }
}

/// Diagnostic snapshot of one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    pub name: String,
    pub available: bool,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}
