//! Core types for gemgate
//!
//! This crate holds the conversation data model, the error taxonomy, the
//! request normalizer and the `Gateway` abstraction implemented by upstream
//! clients.

pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod options;

// Re-exports
pub use config::GateConfig;
pub use content::{FinishReason, GenerationResult, Message, Part, Role};
pub use error::{Error, ErrorKind, Result};
pub use gateway::{Gateway, UpstreamRequest};
pub use normalize::{NormalizedConversation, Normalizer, normalize, sanitize};
pub use options::GenerationOptions;
