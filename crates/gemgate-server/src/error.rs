use crate::types::ErrorBody;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use gemgate_core::Error;

/// Error returned by handlers. Every core error renders to exactly one
/// status code and a JSON body; raw error text only goes to the log.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
        } else {
            tracing::warn!(code = err.code(), error = %err, "Request rejected");
        }

        let body = ErrorBody {
            error: err.public_message(),
            code: err.code().to_string(),
            details: err.public_details(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = err.retry_after() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
