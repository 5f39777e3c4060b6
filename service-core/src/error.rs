use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Unapproved: {0}")]
    Unapproved(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    /// A collaborator fault whose status code is passed through to the caller.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Build an upstream error from a raw provider code, falling back to 500
    /// when the code is not a usable 4xx/5xx status.
    pub fn upstream(code: Option<u16>, message: impl Into<String>) -> Self {
        let status = code
            .and_then(|c| StatusCode::from_u16(c).ok())
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        AppError::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unapproved(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { status, .. } => *status,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::EmailError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
            fields: None,
            reason: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut retry_after = None;

        let body = match self {
            AppError::ValidationError(err) => ErrorBody {
                fields: serde_json::to_value(&err).ok(),
                details: Some(err.to_string()),
                ..ErrorBody::new("Validation error")
            },
            AppError::BadRequest(err) | AppError::NotFound(err) | AppError::Conflict(err) => {
                ErrorBody::new(err.to_string())
            }
            AppError::Unauthorized(err) => ErrorBody {
                reason: Some("unauthenticated"),
                ..ErrorBody::new(err.to_string())
            },
            AppError::Unapproved(err) => ErrorBody {
                reason: Some("unapproved"),
                ..ErrorBody::new(err.to_string())
            },
            AppError::Forbidden(err) => ErrorBody {
                reason: Some("forbidden"),
                ..ErrorBody::new(err.to_string())
            },
            AppError::TooManyRequests(msg, retry) => {
                retry_after = retry;
                ErrorBody::new(msg)
            }
            AppError::Upstream { message, .. } => ErrorBody::new(message),
            AppError::InternalError(err) => {
                tracing::error!(error = %format!("{:#}", err), "Internal server error");
                ErrorBody::new("Internal server error")
            }
            AppError::ServiceUnavailable => ErrorBody::new("Service unavailable"),
            AppError::DatabaseError(err) => ErrorBody {
                details: Some(err.to_string()),
                ..ErrorBody::new("Database error")
            },
            AppError::EmailError(msg) => ErrorBody {
                details: Some(msg),
                ..ErrorBody::new("Email error")
            },
            AppError::ConfigError(err) => ErrorBody {
                details: Some(err.to_string()),
                ..ErrorBody::new("Configuration error")
            },
        };

        let mut res = (status, Json(body)).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_provider_error_codes() {
        let err = AppError::upstream(Some(404), "missing");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_falls_back_to_500_for_unusable_codes() {
        assert_eq!(
            AppError::upstream(None, "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::upstream(Some(0), "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::upstream(Some(200), "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn unapproved_renders_reason_code() {
        let res = AppError::Unapproved(anyhow::anyhow!("pending approval")).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "unapproved");
        assert_eq!(body["error"], "pending approval");
    }

    #[tokio::test]
    async fn email_error_is_internal_with_details() {
        let res = AppError::EmailError("relay refused".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Email error");
        assert_eq!(body["details"], "relay refused");
    }
}
