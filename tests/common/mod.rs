//! Common test utilities: a stub Gemini upstream and router wiring

use axum::{Router, http::StatusCode, response::IntoResponse, routing::post};
use gemgate_core::GateConfig;
use gemgate_server::{AppState, RateLimiter, create_router};
use gemgate_upstream::GeminiGateway;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a stub `generateContent` endpoint that always answers with the
/// given status, extra headers and JSON body. Returns the base URL to hand
/// to the gateway.
pub async fn spawn_upstream(
    status: StatusCode,
    headers: Vec<(&'static str, &'static str)>,
    body: Value,
) -> String {
    let body = body.to_string();
    let app = Router::new().route(
        "/v1beta/models/:action",
        post(move || {
            let body = body.clone();
            let headers = headers.clone();
            async move {
                let mut response = (status, body).into_response();
                for (name, value) in headers {
                    response.headers_mut().insert(name, value.parse().unwrap());
                }
                response
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1beta/models", addr)
}

/// Base URL pointing at a port nothing listens on.
pub async fn closed_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1beta/models", addr)
}

/// Full router backed by the real Gemini gateway.
pub fn gemini_router(base_url: &str, rate_limiter: Option<Arc<dyn RateLimiter>>) -> Router {
    let mut config = GateConfig::test_defaults();
    config.upstream.base_url = base_url.to_string();

    let gateway = GeminiGateway::from_config(&config.upstream).unwrap();
    let state = AppState::new(&config, Arc::new(gateway), rate_limiter);
    create_router(&config, state)
}
