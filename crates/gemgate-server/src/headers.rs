//! Fixed response headers added to every response

use axum::Router;
use axum::http::{HeaderName, HeaderValue, header};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

/// Attach permissive CORS headers and a JSON content type to every response.
///
/// CORS values always override; the content type is only set when the
/// handler did not choose one.
pub fn with_response_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(overriding(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                ALLOW_ORIGIN,
            ))
            .layer(overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                ALLOW_METHODS,
            ))
            .layer(overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                ALLOW_HEADERS,
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )),
    )
}

fn overriding(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}
