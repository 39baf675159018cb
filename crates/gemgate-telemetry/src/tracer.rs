//! Subscriber setup

use gemgate_core::config::ObservabilityConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize structured logging.
///
/// `RUST_LOG` wins over `observability.log_level`. With
/// `observability.log_format = "json"` every event is emitted as one JSON
/// object per line, including the fields of the enclosing spans.
///
/// # Example
///
/// ```rust,no_run
/// use gemgate_core::config::ObservabilityConfig;
/// use gemgate_telemetry::init_telemetry;
///
/// init_telemetry(&ObservabilityConfig::default()).expect("logging already initialized");
/// ```
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let json = is_json(config);

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
    });

    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
}

fn is_json(config: &ObservabilityConfig) -> bool {
    config.log_format.trim().eq_ignore_ascii_case("json")
}
