//! HTTP error responses.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::{GenerationError, ValidationError};

/// Everything a handler or middleware can reject a request with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request")]
    Validation(#[from] ValidationError),

    /// Body failed to decode (bad JSON, unknown enum value, missing field).
    #[error("invalid request body")]
    InvalidBody(String),

    #[error("invalid or missing API key")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("draft generation failed")]
    Generation(#[from] GenerationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Generation(GenerationError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Self::Validation(e) => Some(e.to_string()),
            Self::InvalidBody(reason) => Some(reason.clone()),
            Self::RateLimited { retry_after } => {
                Some(format!("retry in {}s", retry_secs(*retry_after)))
            }
            Self::Generation(e) => Some(e.to_string()),
            Self::Unauthorized => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, detail = ?self.detail(), "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "detail": self.detail(),
        }));
        let mut response = (status, body).into_response();

        if let Self::RateLimited { retry_after } = &self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_secs(*retry_after)));
        }
        response
    }
}

/// Whole seconds, rounded up so clients never retry early.
fn retry_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}
