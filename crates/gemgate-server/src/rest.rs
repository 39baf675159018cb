use crate::error::AppError;
use crate::headers::with_response_headers;
use crate::rate_limit::{RateDecision, RateLimiter, client_identifier};
use crate::types::{ChatRequest, ChatResponse};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gemgate_core::config::{GateConfig, GenerationConfig};
use gemgate_core::{Error, Gateway, GenerationOptions, Normalizer, UpstreamRequest};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub normalizer: Arc<Normalizer>,
    pub generation: Arc<GenerationConfig>,
    pub include_metadata: bool,
    pub trust_forwarded_headers: bool,
}

impl AppState {
    pub fn new(
        config: &GateConfig,
        gateway: Arc<dyn Gateway>,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        Self {
            gateway,
            rate_limiter,
            normalizer: Arc::new(Normalizer::new(&config.normalizer)),
            generation: Arc::new(config.generation.clone()),
            include_metadata: config.server.include_metadata,
            trust_forwarded_headers: config.rate_limit.trust_forwarded_headers,
        }
    }
}

pub fn create_router(config: &GateConfig, state: AppState) -> Router {
    let chat_route = post(chat).options(preflight).fallback(method_not_allowed);

    let router = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route(&config.server.path, chat_route)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    with_response_headers(router).with_state(state)
}

/// Health check endpoint - returns OK if the service is running
async fn health_check() -> impl IntoResponse {
    tracing::debug!("Health check requested");
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

/// CORS preflight: 200 with an empty body
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    let body = json!({
        "error": "Method not allowed",
        "code": "METHOD_NOT_ALLOWED",
    });
    (StatusCode::METHOD_NOT_ALLOWED, Json(body)).into_response()
}

async fn not_found() -> Response {
    let body = json!({
        "error": "Not found",
        "code": "NOT_FOUND",
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// Body extraction failures become JSON errors like every other outcome.
fn body_rejected(rejection: BytesRejection) -> Response {
    let status = rejection.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        let body = json!({
            "error": "Request body too large",
            "code": "PAYLOAD_TOO_LARGE",
        });
        return (status, Json(body)).into_response();
    }
    AppError(Error::validation(rejection.body_text())).into_response()
}

async fn chat(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(status = rejection.status().as_u16(), "Request body rejected");
            return body_rejected(rejection);
        }
    };

    match handle_chat(&state, peer, &headers, &body).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_chat(
    state: &AppState,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<ChatResponse>, AppError> {
    if let Some(limiter) = &state.rate_limiter {
        let client_id = client_identifier(
            headers,
            peer.map(|ConnectInfo(addr)| addr),
            state.trust_forwarded_headers,
        );
        if let RateDecision::Limited { retry_after } = limiter.check(&client_id) {
            tracing::info!(client = %client_id, "Client rate limited");
            // Round up so a client never retries before its slot frees
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return Err(Error::RateLimited {
                retry_after_secs: secs.max(1),
            }
            .into());
        }
    }

    let request = parse_body(body)?;

    let conversation = state.normalizer.normalize(
        request.history.as_ref(),
        request.prompt.as_ref(),
        request.system_instruction.as_ref(),
    )?;

    let options = GenerationOptions::resolve(
        request.temperature.as_ref(),
        request.max_tokens.as_ref(),
        &state.generation,
    );

    tracing::debug!(
        messages = conversation.messages.len(),
        has_system_instruction = conversation.system_instruction.is_some(),
        "Forwarding conversation upstream"
    );

    let result = state
        .gateway
        .send(UpstreamRequest {
            messages: conversation.messages,
            system_instruction: conversation.system_instruction,
            options,
        })
        .await?;

    Ok(Json(ChatResponse::from_result(result, state.include_metadata)))
}

fn parse_body(body: &[u8]) -> Result<ChatRequest, Error> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("body is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(Error::validation("body must be a JSON object"));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::validation(format!("unreadable request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use gemgate_core::{FinishReason, GenerationResult, Message, Result};
    use mockall::mock;
    use tower::ServiceExt;

    mock! {
        pub TestGateway {}

        #[async_trait]
        impl Gateway for TestGateway {
            async fn send(&self, request: UpstreamRequest) -> Result<GenerationResult>;
        }
    }

    mock! {
        pub TestLimiter {}

        impl RateLimiter for TestLimiter {
            fn check(&self, client_id: &str) -> RateDecision;
        }
    }

    fn ok_result(text: &str) -> GenerationResult {
        GenerationResult {
            text: text.to_string(),
            finish_reason: FinishReason::Stop,
            usage: None,
            safety_ratings: vec![],
        }
    }

    fn router(gateway: MockTestGateway, limiter: Option<MockTestLimiter>) -> Router {
        let config = GateConfig::test_defaults();
        let limiter = limiter.map(|l| Arc::new(l) as Arc<dyn RateLimiter>);
        let state = AppState::new(&config, Arc::new(gateway), limiter);
        create_router(&config, state)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_gateway_receives_normalized_request() {
        let mut gateway = MockTestGateway::new();
        gateway
            .expect_send()
            .withf(|req| {
                req.messages
                    == vec![
                        Message::new_model_text("earlier answer"),
                        Message::new_user_text("next question"),
                    ]
                    && req.system_instruction.as_deref() == Some("Be brief")
                    && req.options.temperature == 0.2
                    && req.options.max_output_tokens == 64
            })
            .times(1)
            .returning(|_| Ok(ok_result("done")));

        let response = router(gateway, None)
            .oneshot(post_json(
                r#"{"history":[{"role":"assistant","text":"earlier   answer"}],
                    "prompt":"next <question>","systemInstruction":"Be brief",
                    "temperature":0.2,"maxTokens":64}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"text": "done"}));
    }

    #[tokio::test]
    async fn test_invalid_json_is_validation_error() {
        // A mock without expectations panics if the gateway is called
        for body in ["{not json", "[1,2,3]", "\"prompt\""] {
            let response = router(MockTestGateway::new(), None)
                .oneshot(post_json(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_rate_limited_client_never_reaches_gateway() {
        let mut gateway = MockTestGateway::new();
        gateway.expect_send().times(0);

        let mut limiter = MockTestLimiter::new();
        limiter
            .expect_check()
            .withf(|client| client.to_string() == "198.51.100.4")
            .times(1)
            .returning(|_| RateDecision::Limited {
                retry_after: std::time::Duration::from_millis(2500),
            });

        let mut request = post_json(r#"{"prompt":"hi"}"#);
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());

        let response = router(gateway, Some(limiter)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "3");
        assert_eq!(body_json(response).await["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_413() {
        let mut config = GateConfig::test_defaults();
        config.server.max_body_bytes = 1024;
        let mut gateway = MockTestGateway::new();
        gateway.expect_send().times(0);
        let app = create_router(&config, AppState::new(&config, Arc::new(gateway), None));

        let prompt = "a".repeat(4096);
        let response = app
            .oneshot(post_json(&json!({ "prompt": prompt }).to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(body_json(response).await["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_forwarded_header_ignored_when_untrusted() {
        let mut config = GateConfig::test_defaults();
        config.rate_limit.trust_forwarded_headers = false;

        let mut gateway = MockTestGateway::new();
        gateway.expect_send().times(0);

        let mut limiter = MockTestLimiter::new();
        limiter
            .expect_check()
            .withf(|client| client.to_string() == "unknown")
            .times(1)
            .returning(|_| RateDecision::Limited {
                retry_after: std::time::Duration::from_secs(1),
            });

        let state = AppState::new(&config, Arc::new(gateway), Some(Arc::new(limiter)));
        let mut request = post_json(r#"{"prompt":"hi"}"#);
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());

        let response = create_router(&config, state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let response = router(MockTestGateway::new(), None)
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(MockTestGateway::new(), None)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
