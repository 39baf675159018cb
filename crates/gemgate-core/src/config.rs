//! Configuration management for gemgate
//!
//! Loads configuration with priority:
//! 1. Specified config file (or config.toml found in the current directory or a parent)
//! 2. Environment variables (fallback for the upstream key)
//! 3. Defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// gemgate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// How the API key is attached to upstream requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `?key=` query parameter
    #[default]
    Query,
    /// `x-goog-api-key` header
    Header,
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API key (can reference env var with ${VAR_NAME})
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Hard timeout for the whole upstream round trip
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Threshold applied to every harm category
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,

    /// Retry hint used when a 429 carries none
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

/// Generation defaults and bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_max_output_tokens_cap")]
    pub max_output_tokens_cap: u32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the chat endpoint
    #[serde(default = "default_path")]
    pub path: String,

    /// Add finishReason, usage and safetyRatings to success bodies
    #[serde(default)]
    pub include_metadata: bool,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Per-client sliding window limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Key clients by `X-Forwarded-For`/`X-Real-IP`. Only safe behind a
    /// proxy that overwrites these headers; otherwise the peer address is used.
    #[serde(default = "default_true")]
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Drop history turns whose sanitized text is empty
    #[serde(default)]
    pub drop_empty_turns: bool,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            auth_mode: AuthMode::default(),
            timeout_secs: default_timeout_secs(),
            safety_threshold: default_safety_threshold(),
            retry_after_secs: default_retry_after_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_output_tokens_cap: default_max_output_tokens_cap(),
            top_k: default_top_k(),
            top_p: default_top_p(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            include_metadata: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trust_forwarded_headers: true,
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            drop_empty_turns: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl GateConfig {
    /// Load configuration from config.toml if one can be found, otherwise
    /// from environment variables and defaults.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config.toml found, using environment and defaults");
                let mut config = Self::default();
                config.resolve_env_vars();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse a TOML document and resolve environment references
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: GateConfig = toml::from_str(contents)?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        let resolved = self
            .upstream
            .api_key
            .as_deref()
            .and_then(Self::resolve_env_var)
            .filter(|key| !key.trim().is_empty());

        // Fall back to the conventional variables when unset or unresolved
        self.upstream.api_key = resolved
            .or_else(|| env::var("GEMINI_API_KEY").ok())
            .or_else(|| env::var("GOOGLE_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());

        if let Some(url) = Self::resolve_env_var(&self.upstream.base_url) {
            self.upstream.base_url = url;
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Create test-friendly defaults (rate limiting off, fixed key)
    pub fn test_defaults() -> Self {
        Self {
            upstream: UpstreamConfig {
                api_key: Some("test-api-key".to_string()),
                ..UpstreamConfig::default()
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
            ..Self::default()
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".to_string()
}

fn default_retry_after_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_max_output_tokens_cap() -> u32 {
    8192
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.95
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/api/chat".to_string()
}

fn default_max_body_bytes() -> usize {
    256 * 1024
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> usize {
    20
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_text_chars() -> usize {
    4000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
