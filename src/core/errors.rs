use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::types::ErrorResponse;

/// The closed set of failures a detection request can terminate with.
///
/// Variants map 1:1 onto the pipeline's terminal failure states; the
/// `IntoResponse` impl below is the single place that decides what HTTP
/// status each one surfaces as.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("node {0} was not found upstream")]
    NodeNotFound(String),

    #[error("metadata has no searchable fields")]
    NotSearchable,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("admin authorization failed")]
    Unauthorized,

    #[error("upstream search service failed: {0}")]
    UpstreamFatal(String),

    #[error("request exceeded its deadline")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DetectionError {
    fn into_response(self) -> Response {
        let status = match &self {
            DetectionError::NodeNotFound(_) => StatusCode::NOT_FOUND,
            DetectionError::NotSearchable => StatusCode::BAD_REQUEST,
            DetectionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DetectionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DetectionError::Unauthorized => StatusCode::FORBIDDEN,
            DetectionError::UpstreamFatal(_) => StatusCode::SERVICE_UNAVAILABLE,
            DetectionError::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,
            DetectionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
