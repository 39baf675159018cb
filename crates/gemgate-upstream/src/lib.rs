//! Google Gemini upstream gateway
//!
//! Sends normalized conversations to `generateContent` and classifies every
//! outcome into the `gemgate_core::Error` taxonomy.

pub mod auth;
pub mod classify;
pub mod gemini;
pub mod types;

pub use auth::GeminiAuth;
pub use gemini::{GeminiGateway, GeminiGatewayBuilder};
