use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type shared by the gateway and all services.
///
/// Every expected failure condition maps to a structured HTTP response with a
/// `{success: false, message: ...}` body; only genuinely unexpected faults
/// surface as a generic 500.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Admission =====
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    TooManyRequests { retry_after_secs: u64 },

    // ===== Authentication & Authorization =====
    /// The inner reason (missing/malformed/expired/bad signature) is surfaced
    /// only in logs; the client always sees the same uniform message.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    // ===== Upstream dispatch =====
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    // ===== Client input =====
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource conflict: {0}")]
    Conflict(String),

    // ===== Infrastructure =====
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event bus error: {0}")]
    Bus(#[from] lapin::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::TooManyRequests { .. } => {
                "Rate limit exceeded, too many requests".to_string()
            }
            AppError::Auth(_) | AppError::Jwt(_) => {
                "Invalid or missing authentication token".to_string()
            }
            AppError::Forbidden(msg) => msg.clone(),
            AppError::Upstream(_) => "Bad Gateway: service unavailable".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} not found", msg),
            AppError::Conflict(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Log with a level matching the severity of the condition.
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, status = status.as_u16(), "server error");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self, "authentication failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "client error");
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::Upstream(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();

        // Upstream failures carry the underlying detail for observability;
        // other server errors never expose internals.
        let body = match &self {
            AppError::Upstream(detail) => json!({
                "success": false,
                "message": self.user_message(),
                "error": detail,
            }),
            _ => json!({
                "success": false,
                "message": self.user_message(),
            }),
        };

        let mut response = (status, Json(body)).into_response();

        if let AppError::TooManyRequests { retry_after_secs } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::TooManyRequests { retry_after_secs: 5 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::auth("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::upstream("connect refused").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::validation("content is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("post".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("user already exists".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_message_is_uniform() {
        // Distinct failure reasons must not leak to the client.
        let missing = AppError::auth("no token provided");
        let expired = AppError::auth("token expired");
        let bad_sig = AppError::auth("invalid signature");
        assert_eq!(missing.user_message(), expired.user_message());
        assert_eq!(expired.user_message(), bad_sig.user_message());
    }

    #[test]
    fn internal_detail_never_leaks() {
        let err = AppError::internal("db password rejected");
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn retry_after_header_set() {
        let response =
            AppError::TooManyRequests { retry_after_secs: 180 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("retry-after").unwrap(),
            "180"
        );
    }
}
