//! Logging and tracing setup for gemgate

pub mod attributes;
pub mod spans;
pub mod tracer;

pub use spans::{safe_serialize, upstream_span};
pub use tracer::init_telemetry;
