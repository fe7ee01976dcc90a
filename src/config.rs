//! Configuration for nudge.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (NUDGE_HOME, NUDGE_CONTACTS, OPENAI_API_KEY,
//!    NUDGE_OPENAI_BASE_URL, NUDGE_OLLAMA_URL)
//! 2. Config file (.nudge/config.yaml)
//! 3. Defaults (~/.nudge)
//!
//! Config file discovery:
//! - Searches current directory and parents for .nudge/config.yaml
//! - Paths in config file are relative to the .nudge/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::CallBudget;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub resilience: ResilienceSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .nudge/)
    pub home: Option<String>,
    /// Task store file
    pub tasks: Option<String>,
    /// Contacts YAML
    pub contacts: Option<String>,
    /// Capture log file
    pub capture_log: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub remote: RemoteProviderSettings,
    #[serde(default)]
    pub local: LocalProviderSettings,
}

/// Remote (chat-completions) provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProviderSettings {
    #[serde(default = "default_remote_url")]
    pub base_url: String,
    #[serde(default = "default_remote_model")]
    pub model: String,
    /// Prefer OPENAI_API_KEY over putting keys in the file
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Chat temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_remote_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_remote_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.85
}

impl Default for RemoteProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            model: default_remote_model(),
            api_key: None,
            temperature: default_temperature(),
        }
    }
}

/// Local (on-device) provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_local_url")]
    pub base_url: String,
    #[serde(default = "default_local_model")]
    pub model: String,
}

fn default_true() -> bool {
    true
}
fn default_local_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_local_model() -> String {
    "llama3.2".to_string()
}

impl Default for LocalProviderSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_local_url(),
            model: default_local_model(),
        }
    }
}

/// Timeouts, retry and circuit-breaker tuning for the AI client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceSettings {
    /// Wait for the first byte of a response (default: 8s)
    #[serde(default = "default_first_response_ms")]
    pub first_response_timeout_ms: u64,

    /// Whole-attempt timeout (default: 15s)
    #[serde(default = "default_attempt_ms")]
    pub attempt_timeout_ms: u64,

    /// Fixed pause before the single retry (default: 1s)
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Failed calls before the circuit opens (default: 3)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Rolling window the failures must fall in (default: 5 min)
    #[serde(default = "default_window_seconds")]
    pub failure_window_seconds: u64,

    /// How long an open circuit stays open (default: 2 min)
    #[serde(default = "default_cooldown_seconds")]
    pub circuit_cooldown_seconds: u64,

    /// Budget for the whole provider chain before the keyword tier answers
    /// (default: 30s)
    #[serde(default = "default_deadline_seconds")]
    pub chain_deadline_seconds: u64,
}

fn default_first_response_ms() -> u64 {
    8_000
}
fn default_attempt_ms() -> u64 {
    15_000
}
fn default_backoff_ms() -> u64 {
    1_000
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_window_seconds() -> u64 {
    300
}
fn default_cooldown_seconds() -> u64 {
    120
}
fn default_deadline_seconds() -> u64 {
    30
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            first_response_timeout_ms: default_first_response_ms(),
            attempt_timeout_ms: default_attempt_ms(),
            retry_backoff_ms: default_backoff_ms(),
            failure_threshold: default_failure_threshold(),
            failure_window_seconds: default_window_seconds(),
            circuit_cooldown_seconds: default_cooldown_seconds(),
            chain_deadline_seconds: default_deadline_seconds(),
        }
    }
}

impl ResilienceSettings {
    pub fn call_budget(&self) -> CallBudget {
        CallBudget {
            first_response: Duration::from_millis(self.first_response_timeout_ms),
            overall: Duration::from_millis(self.attempt_timeout_ms),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn failure_window(&self) -> Duration {
        Duration::from_secs(self.failure_window_seconds)
    }

    pub fn circuit_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_cooldown_seconds)
    }

    pub fn chain_deadline(&self) -> Duration {
        Duration::from_secs(self.chain_deadline_seconds)
    }

    /// Longest one tier can take: two full attempts and the backoff between
    pub fn tier_worst_case(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms) * 2 + self.retry_backoff()
    }

    /// Deadline for a chain of `tiers` provider tiers. Never shorter than
    /// the sum of their worst cases, so no tier is cut off mid-retry.
    pub fn chain_deadline_for(&self, tiers: usize) -> Duration {
        let floor = self.tier_worst_case() * tiers.max(1) as u32;
        self.chain_deadline().max(floor)
    }
}

/// Session-level tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Overlap ratio that flags a duplicate (default: 0.7)
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    /// Chat messages kept in history (default: 20)
    #[serde(default = "default_chat_window")]
    pub chat_history_window: usize,

    /// Most candidates surfaced from one utterance (default: 10)
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_duplicate_threshold() -> f64 {
    0.7
}
fn default_chat_window() -> usize {
    20
}
fn default_max_candidates() -> usize {
    10
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            chat_history_window: default_chat_window(),
            max_candidates: default_max_candidates(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Task store (JSONL)
    pub tasks: PathBuf,
    /// Contacts address book (YAML)
    pub contacts: PathBuf,
    /// Capture log (JSONL)
    pub capture_log: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub remote: RemoteProviderSettings,
    pub local: LocalProviderSettings,
    pub resilience: ResilienceSettings,
    pub capture: CaptureSettings,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".nudge").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config YAML
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(serde_yaml::from_str(content)?)
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Combine a parsed file (and where it lives) with env overrides
fn resolve(file: ConfigFile, config_file: Option<PathBuf>, default_home: PathBuf) -> ResolvedConfig {
    // Paths in the file are relative to the .nudge/ directory
    let base = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    let from_file = |value: &Option<String>| -> Option<PathBuf> {
        match (&base, value) {
            (Some(base), Some(v)) => Some(resolve_path(base, v)),
            (None, Some(v)) => Some(PathBuf::from(v)),
            _ => None,
        }
    };

    let home = env_var("NUDGE_HOME")
        .map(PathBuf::from)
        .or_else(|| from_file(&file.paths.home))
        .unwrap_or(default_home);

    let tasks = from_file(&file.paths.tasks).unwrap_or_else(|| home.join("tasks.jsonl"));

    let contacts = env_var("NUDGE_CONTACTS")
        .map(PathBuf::from)
        .or_else(|| from_file(&file.paths.contacts))
        .unwrap_or_else(|| home.join("contacts.yaml"));

    let capture_log = from_file(&file.paths.capture_log).unwrap_or_else(|| home.join("capture_log.jsonl"));

    let mut remote = file.providers.remote;
    if let Some(key) = env_var("OPENAI_API_KEY") {
        remote.api_key = Some(key);
    }
    if let Some(url) = env_var("NUDGE_OPENAI_BASE_URL") {
        remote.base_url = url;
    }

    let mut local = file.providers.local;
    if let Some(url) = env_var("NUDGE_OLLAMA_URL") {
        local.base_url = url;
    }

    ResolvedConfig {
        home,
        tasks,
        contacts,
        capture_log,
        config_file,
        remote,
        local,
        resilience: file.resilience,
        capture: file.capture,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".nudge");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(file, config_file, default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the task store path
pub fn tasks_path() -> Result<PathBuf> {
    Ok(config()?.tasks.clone())
}

/// Get the capture log path
pub fn capture_log_path() -> Result<PathBuf> {
    Ok(config()?.capture_log.clone())
}
