//! Gemini gateway implementation

use crate::auth::GeminiAuth;
use crate::classify::{classify_error_status, extract_result};
use crate::types::{GeminiRequest, GenerationConfig, SafetySetting, SystemInstruction, SystemPart};
use async_trait::async_trait;
use gemgate_core::config::{AuthMode, UpstreamConfig};
use gemgate_core::{Error, Gateway, GenerationResult, Result, UpstreamRequest};
use gemgate_telemetry::spans::{record_outcome, upstream_span};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use std::time::Duration;
use tracing::Instrument;

/// Gateway to the Gemini `generateContent` endpoint.
///
/// Holds the credential for the lifetime of the process. Each call to
/// [`Gateway::send`] performs exactly one HTTP round trip.
pub struct GeminiGateway {
    client: Client,
    auth: GeminiAuth,
    model: String,
    base_url: String,
    safety_settings: Vec<SafetySetting>,
    retry_after_secs: u64,
}

impl GeminiGateway {
    pub fn builder() -> GeminiGatewayBuilder {
        GeminiGatewayBuilder::new()
    }

    /// Build a gateway from the `[upstream]` configuration section.
    ///
    /// Fails with `Error::Config` when the API key is missing or blank.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .model(config.model.clone())
            .base_url(config.base_url.clone())
            .auth_mode(config.auth_mode)
            .timeout(Duration::from_secs(config.timeout_secs))
            .safety_threshold(config.safety_threshold.clone())
            .retry_after_secs(config.retry_after_secs);
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        builder.build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(&self, request: UpstreamRequest) -> GeminiRequest {
        GeminiRequest {
            contents: request.messages,
            system_instruction: request.system_instruction.map(|text| SystemInstruction {
                parts: vec![SystemPart { text }],
            }),
            generation_config: GenerationConfig {
                temperature: request.options.temperature.clamp(0.0, 1.0),
                max_output_tokens: request.options.max_output_tokens.max(1),
                top_p: request.options.top_p,
                top_k: request.options.top_k,
            },
            safety_settings: self.safety_settings.clone(),
        }
    }

    async fn round_trip(&self, body: GeminiRequest) -> Result<GenerationResult> {
        let response = self
            .auth
            .apply(self.client.post(self.build_url()).json(&body))
            .send()
            .await
            .map_err(|e| {
                // The URL may carry the API key as a query parameter
                let e = e.without_url();
                tracing::error!(error = %e, timeout = e.is_timeout(), connect = e.is_connect(), "Upstream request failed");
                Error::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!(error = %e, timeout = e.is_timeout(), "Failed to read upstream response body");
            Error::ServiceUnavailable(e.to_string())
        })?;

        if !status.is_success() {
            let err = classify_error_status(
                status.as_u16(),
                retry_after.as_deref(),
                &text,
                self.retry_after_secs,
            );
            tracing::warn!(status = status.as_u16(), code = err.code(), "Upstream returned an error status");
            return Err(err);
        }

        extract_result(&text)
    }
}

#[async_trait]
impl Gateway for GeminiGateway {
    async fn send(&self, request: UpstreamRequest) -> Result<GenerationResult> {
        let span = upstream_span(&self.model, &request);
        let body = self.build_request(request);

        let outcome = self.round_trip(body).instrument(span.clone()).await;
        record_outcome(&span, &outcome);
        outcome
    }
}

/// Builder for GeminiGateway
pub struct GeminiGatewayBuilder {
    api_key: Option<String>,
    auth_mode: AuthMode,
    model: String,
    base_url: String,
    timeout: Duration,
    safety_threshold: String,
    retry_after_secs: u64,
}

impl GeminiGatewayBuilder {
    /// Create a new builder with the `[upstream]` defaults
    pub fn new() -> Self {
        let defaults = UpstreamConfig::default();
        Self {
            api_key: None,
            auth_mode: defaults.auth_mode,
            model: defaults.model,
            base_url: defaults.base_url,
            timeout: Duration::from_secs(defaults.timeout_secs),
            safety_threshold: defaults.safety_threshold,
            retry_after_secs: defaults.retry_after_secs,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Hard limit for the whole round trip, including reading the body
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn safety_threshold(mut self, threshold: impl Into<String>) -> Self {
        self.safety_threshold = threshold.into();
        self
    }

    pub fn retry_after_secs(mut self, secs: u64) -> Self {
        self.retry_after_secs = secs;
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<GeminiGateway> {
        let key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::config_error("upstream API key is missing or blank"))?;

        if self.model.trim().is_empty() {
            return Err(Error::config_error("upstream model name is empty"));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("failed to build HTTP client: {}", e)))?;

        Ok(GeminiGateway {
            client,
            auth: GeminiAuth::new(key, self.auth_mode),
            model: self.model,
            base_url: self.base_url,
            safety_settings: SafetySetting::uniform(&self.safety_threshold),
            retry_after_secs: self.retry_after_secs,
        })
    }
}

impl Default for GeminiGatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemgate_core::{ErrorKind, GenerationOptions, Message};

    #[test]
    fn test_missing_key_fails_fast() {
        let err = GeminiGateway::builder().build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = GeminiGateway::builder().api_key("   ").build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_config_without_key() {
        let err = GeminiGateway::from_config(&UpstreamConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_build_url() {
        let gateway = GeminiGateway::builder()
            .api_key("k")
            .model("gemini-1.5-pro")
            .base_url("http://localhost:9999/v1beta/models/")
            .build()
            .unwrap();
        assert_eq!(
            gateway.build_url(),
            "http://localhost:9999/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_build_request_uses_dedicated_system_field() {
        let gateway = GeminiGateway::builder().api_key("k").build().unwrap();
        let body = gateway.build_request(UpstreamRequest {
            messages: vec![Message::new_user_text("hi")],
            system_instruction: Some("be brief".to_string()),
            options: GenerationOptions::default(),
        });

        assert_eq!(body.contents.len(), 1);
        assert_eq!(body.system_instruction.unwrap().parts[0].text, "be brief");
        assert_eq!(body.safety_settings.len(), 4);
        assert!(body
            .safety_settings
            .iter()
            .all(|s| s.threshold == "BLOCK_MEDIUM_AND_ABOVE"));
    }
}
