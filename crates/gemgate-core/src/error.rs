use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Configuration,
    RateLimited,
    Unauthorized,
    ContentBlocked,
    BadRequest,
    MalformedUpstreamResponse,
    ServiceUnavailable,
    UpstreamError,
}

impl ErrorKind {
    /// HTTP status code the kind is rendered with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Configuration => 500,
            ErrorKind::RateLimited => 429,
            ErrorKind::Unauthorized => 403,
            ErrorKind::ContentBlocked => 400,
            ErrorKind::BadRequest => 400,
            ErrorKind::MalformedUpstreamResponse => 500,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::UpstreamError => 502,
        }
    }

    /// Stable machine-readable code placed in error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::ContentBlocked => "CONTENT_BLOCKED",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::MalformedUpstreamResponse => "MALFORMED_UPSTREAM_RESPONSE",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::UpstreamError => "UPSTREAM_ERROR",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream rejected the credential: {0}")]
    Unauthorized(String),

    #[error("Content was blocked by the safety filter: {0}")]
    ContentBlocked(String),

    #[error("Upstream rejected the request: {0}")]
    BadRequest(String),

    #[error("Upstream returned an unexpected response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure. The message is for logs only.
    #[error("Upstream service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
}

impl Error {
    /// Helper for creating validation errors
    ///
    /// # Example
    /// ```
    /// use gemgate_core::Error;
    /// let err = Error::validation("prompt is required");
    /// assert_eq!(err.status_code(), 400);
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use gemgate_core::Error;
    /// let err = Error::config_error("upstream API key is not set");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Config(_) => ErrorKind::Configuration,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::ContentBlocked(_) => ErrorKind::ContentBlocked,
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::MalformedResponse(_) => ErrorKind::MalformedUpstreamResponse,
            Error::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Error::Upstream { .. } => ErrorKind::UpstreamError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Retry hint in seconds, only set for `RateLimited`.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Human-readable message that is safe to return to a caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation => "Invalid request".to_string(),
            ErrorKind::Configuration => "Server is not configured correctly".to_string(),
            ErrorKind::RateLimited => "Too many requests, please retry later".to_string(),
            ErrorKind::Unauthorized => "Upstream rejected the server credential".to_string(),
            ErrorKind::ContentBlocked => {
                "The request or response was blocked by the content safety filter. \
                 Please rephrase and try again"
                    .to_string()
            }
            ErrorKind::BadRequest => "Upstream rejected the request".to_string(),
            ErrorKind::MalformedUpstreamResponse => {
                "Upstream returned an unexpected response".to_string()
            }
            ErrorKind::ServiceUnavailable => {
                "Upstream service is temporarily unavailable".to_string()
            }
            ErrorKind::UpstreamError => "Upstream request failed".to_string(),
        }
    }

    /// Short detail string for the caller. Transport and internal failures
    /// never expose their raw text.
    pub fn public_details(&self) -> Option<String> {
        match self {
            Error::Validation(msg)
            | Error::ContentBlocked(msg)
            | Error::BadRequest(msg) => Some(truncate_details(msg)),
            Error::RateLimited { retry_after_secs } => {
                Some(format!("retry after {retry_after_secs} seconds"))
            }
            Error::Upstream { status, .. } => Some(format!("upstream status {status}")),
            Error::Config(_)
            | Error::Unauthorized(_)
            | Error::MalformedResponse(_)
            | Error::ServiceUnavailable(_) => None,
        }
    }
}

const MAX_DETAILS_CHARS: usize = 200;

fn truncate_details(msg: &str) -> String {
    match msg.char_indices().nth(MAX_DETAILS_CHARS) {
        Some((idx, _)) => format!("{}...", &msg[..idx]),
        None => msg.to_string(),
    }
}
