//! HTTP surface for gemgate

pub mod error;
pub mod headers;
pub mod rate_limit;
pub mod rest;
pub mod types;

pub use error::AppError;
pub use rate_limit::{RateDecision, RateLimiter, SlidingWindowLimiter};
pub use rest::{AppState, create_router};
pub use types::*;
