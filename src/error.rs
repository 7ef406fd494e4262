use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::cookie::removal_cookie;
use crate::response::status_label;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid input")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("invalid JWT token")]
    InvalidToken,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Error that also drops the session cookie on the way out.
    #[error("{message}")]
    EndSession { code: StatusCode, message: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::EndSession { code, .. } => *code,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(_) => "Invalid input".to_string(),
            ApiError::InvalidToken => "Invalid JWT token".to_string(),
            // Detail error database hanya masuk log
            ApiError::Database(_) => "Database error".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Shorthand for a single-field validation failure.
pub fn invalid(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::Validation(vec![FieldError::new(field, message)])
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();

        match &self {
            ApiError::Database(err) => tracing::error!(error = ?err, "database error"),
            ApiError::Internal(msg) => tracing::error!(%msg, "internal error"),
            _ => tracing::debug!(status = code.as_u16(), error = %self, "request rejected"),
        }

        let mut body = json!({
            "status": status_label(code),
            "message": self.message(),
        });
        if let ApiError::Validation(details) = &self {
            body["details"] = json!(details);
        }

        let mut response = (code, Json(body)).into_response();
        if matches!(self, ApiError::EndSession { .. }) {
            if let Ok(value) = HeaderValue::from_str(&removal_cookie().to_string()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Token yang user-nya sudah dihapus: tutup sesinya, jangan 500
        if let sqlx::Error::Database(db_err) = &err {
            let stale_owner = db_err.is_foreign_key_violation()
                && db_err
                    .constraint()
                    .is_some_and(|name| name.ends_with("_user_id_fkey"));
            if stale_owner {
                return ApiError::EndSession {
                    code: StatusCode::NOT_FOUND,
                    message: "User not found".to_string(),
                };
            }
        }
        ApiError::Database(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("No input data provided".to_string())
            }
            other => invalid("body", other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        invalid("path", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        invalid("query", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::Conflict("taken".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn end_session_clears_cookie() {
        let response = ApiError::EndSession {
            code: StatusCode::FORBIDDEN,
            message: "Forbidden: User type mismatch".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("access_token_cookie="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn database_detail_is_not_leaked() {
        let err = ApiError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.message(), "Database error");
    }
}
