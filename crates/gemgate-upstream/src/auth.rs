//! Gemini authentication strategies

use gemgate_core::config::AuthMode;
use reqwest::RequestBuilder;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// How the API key is attached to an upstream request
#[derive(Clone)]
pub enum GeminiAuth {
    /// `key` query parameter (generativelanguage.googleapis.com default)
    ApiKeyQuery(String),
    /// `x-goog-api-key` header, keeps the key out of URLs and access logs
    ApiKeyHeader(String),
}

impl GeminiAuth {
    pub fn new(key: String, mode: AuthMode) -> Self {
        match mode {
            AuthMode::Query => GeminiAuth::ApiKeyQuery(key),
            AuthMode::Header => GeminiAuth::ApiKeyHeader(key),
        }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            GeminiAuth::ApiKeyQuery(key) => builder.query(&[("key", key.as_str())]),
            GeminiAuth::ApiKeyHeader(key) => builder.header(API_KEY_HEADER, key.as_str()),
        }
    }
}

// The key must never reach logs through a derived Debug.
impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiAuth::ApiKeyQuery(_) => f.write_str("ApiKeyQuery(***)"),
            GeminiAuth::ApiKeyHeader(_) => f.write_str("ApiKeyHeader(***)"),
        }
    }
}
