use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WayfarerError};

/// Top-level Wayfarer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub fallback_models: Vec<ModelConfig>,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Extra HTTP headers sent with every request (merged over preset headers).
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

fn default_provider() -> String { "groq".to_string() }
fn default_max_tokens() -> u32 { 4096 }
fn default_temperature() -> f32 { 0.0 }

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Per-run orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ceiling on delegated calls for a booking run (graph or handoff).
    #[serde(default = "default_usage_limit")]
    pub usage_limit: u64,
    /// Ceiling on delegated calls for a travel-planning run.
    #[serde(default = "default_plan_usage_limit")]
    pub plan_usage_limit: u64,
    /// Ceiling on delegated calls for a single best-flight search.
    #[serde(default = "default_search_usage_limit")]
    pub search_usage_limit: u64,
    /// What the traveller asks the seat worker for.
    #[serde(default = "default_seat_preference")]
    pub seat_preference: String,
    /// Payment instrument description passed to the payment worker.
    #[serde(default = "default_payment_info")]
    pub payment_info: String,
    /// Issue outbound and return searches concurrently when planning.
    #[serde(default)]
    pub concurrent_delegation: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            usage_limit: default_usage_limit(),
            plan_usage_limit: default_plan_usage_limit(),
            search_usage_limit: default_search_usage_limit(),
            seat_preference: default_seat_preference(),
            payment_info: default_payment_info(),
            concurrent_delegation: false,
        }
    }
}

fn default_usage_limit() -> u64 { 15 }
fn default_plan_usage_limit() -> u64 { 10 }
fn default_search_usage_limit() -> u64 { 5 }
fn default_seat_preference() -> String {
    "I'd like a window seat with extra legroom if possible".to_string()
}
fn default_payment_info() -> String { "Credit card ending in 1234".to_string() }

/// Which worker implementations back the stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Use the offline mock workers instead of the configured model.
    #[serde(default)]
    pub mock: bool,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WayfarerError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn parse(content: &str) -> Result<Self> {
        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| WayfarerError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Build a minimal config from the environment when no file exists.
    ///
    /// Reads `WAYFARER_PROVIDER`, `WAYFARER_MODEL` and `GROQ_API_KEY`.
    pub fn from_env() -> Self {
        let provider = std::env::var("WAYFARER_PROVIDER").unwrap_or_else(|_| default_provider());
        let model_id = std::env::var("WAYFARER_MODEL")
            .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
        Self {
            model: ModelConfig {
                provider,
                model_id,
                api_key: std::env::var("GROQ_API_KEY").ok(),
                base_url: None,
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                retry: None,
                extra_headers: HashMap::new(),
            },
            fallback_models: vec![],
            run: RunConfig::default(),
            workers: WorkersConfig::default(),
        }
    }

    fn check(&self) -> Result<()> {
        if self.model.model_id.trim().is_empty() {
            return Err(WayfarerError::Config("model.model_id is empty".into()));
        }
        if self.run.usage_limit == 0 {
            return Err(WayfarerError::Config("run.usage_limit must be at least 1".into()));
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
