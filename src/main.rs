//! gemgate server binary
//!
//! ```bash
//! export GEMINI_API_KEY="your-api-key"
//! cargo run -- --config config.toml
//!
//! curl -X POST http://localhost:8080/api/chat \
//!   -H "Content-Type: application/json" \
//!   -d '{"prompt":"Give me one growth tactic","history":[]}'
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use gemgate_core::GateConfig;
use gemgate_server::{AppState, RateLimiter, SlidingWindowLimiter, create_router};
use gemgate_telemetry::init_telemetry;
use gemgate_upstream::GeminiGateway;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gemgate", version, about = "Chat proxy for the Gemini API")]
struct Cli {
    /// Path to a TOML config file (defaults to config.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GateConfig::load_from(path)?,
        None => GateConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_telemetry(&config.observability).context("Failed to initialize logging")?;

    if !config.server.path.starts_with('/') {
        bail!("server.path must start with '/', got {:?}", config.server.path);
    }

    let gateway = GeminiGateway::from_config(&config.upstream).context(
        "Cannot start without an upstream API key. Set [upstream].api_key in config.toml \
         or export GEMINI_API_KEY",
    )?;
    tracing::info!(model = gateway.model(), "Upstream gateway ready");

    let rate_limiter: Option<Arc<dyn RateLimiter>> = if config.rate_limit.enabled {
        Some(Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        )))
    } else {
        None
    };

    let state = AppState::new(&config, Arc::new(gateway), rate_limiter);
    let app = create_router(&config, state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(address = %addr, path = %config.server.path, "gemgate listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
