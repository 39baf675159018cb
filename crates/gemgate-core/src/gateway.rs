//! Abstraction over the upstream text-generation service

use crate::{GenerationOptions, GenerationResult, Message, Result};
use async_trait::async_trait;

/// Everything the upstream needs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub messages: Vec<Message>,
    pub system_instruction: Option<String>,
    pub options: GenerationOptions,
}

/// Upstream gateway
///
/// Implementations perform exactly one network round trip per call and map
/// every outcome onto the crate's `Error` taxonomy. Retrying is left to the
/// caller.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<GenerationResult>;
}
