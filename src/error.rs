use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::supabase::SupabaseError;

/// Wire shape for every error this server returns.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Single funnel for handler failures. Upstream and internal errors keep
/// their diagnostics server-side (logged here) and reach clients as a
/// generic message; auth failures distinguish 401 from 403.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] SupabaseError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("too many failed login attempts, try again later")]
    RateLimited,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // path validation failures are client errors, not backend failures
            ApiError::Upstream(SupabaseError::InvalidPath(segment)) => (
                StatusCode::BAD_REQUEST,
                format!("invalid table, bucket or object path: {segment}"),
            ),
            ApiError::Upstream(err) => {
                error!("backend request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream request failed".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ApiError::Forbidden(msg) => {
                warn!("forbidden: {msg}");
                (StatusCode::FORBIDDEN, msg)
            }
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many failed login attempts, try again later".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
