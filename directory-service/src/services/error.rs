use service_core::error::AppError;
use thiserror::Error;

use super::identity::IdentityError;
use super::store::StoreError;
use crate::models::InvalidTransition;

/// Failures of the directory workflows, independent of transport.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A write to the document store failed.
    #[error("{message}")]
    Storage { status: Option<u16>, message: String },

    /// A read from the document store failed.
    #[error("{message}")]
    Retrieval { status: Option<u16>, message: String },

    #[error("{0}")]
    Provisioning(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Unapproved(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Notification failed: {0}")]
    Notification(String),
}

impl WorkflowError {
    pub fn storage(err: StoreError) -> Self {
        WorkflowError::Storage {
            status: err.status_code(),
            message: err.to_string(),
        }
    }

    pub fn retrieval(err: StoreError) -> Self {
        WorkflowError::Retrieval {
            status: err.status_code(),
            message: err.to_string(),
        }
    }

    /// Map an identity-provider failure on a session path.
    pub fn from_session(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => {
                WorkflowError::Unauthenticated("Invalid email or password".to_string())
            }
            IdentityError::Unauthenticated => {
                WorkflowError::Unauthenticated("Session is missing or expired".to_string())
            }
            other => WorkflowError::Retrieval {
                status: other.status_code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<InvalidTransition> for WorkflowError {
    fn from(err: InvalidTransition) -> Self {
        WorkflowError::Conflict(err.to_string())
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            WorkflowError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            WorkflowError::Storage { status, message }
            | WorkflowError::Retrieval { status, message } => AppError::upstream(status, message),
            WorkflowError::Provisioning(msg) => AppError::upstream(None, msg),
            WorkflowError::Unauthenticated(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            WorkflowError::Unapproved(msg) => AppError::Unapproved(anyhow::anyhow!(msg)),
            WorkflowError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            WorkflowError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            WorkflowError::Notification(msg) => AppError::EmailError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn schema_violations_surface_as_bad_request() {
        let err = WorkflowError::storage(StoreError::Schema("missing field".into()));
        assert_eq!(AppError::from(err).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_faults_keep_numeric_status_or_fall_back_to_500() {
        let with_code = WorkflowError::retrieval(StoreError::Backend {
            code: Some(503),
            message: "unavailable".into(),
        });
        assert_eq!(
            AppError::from(with_code).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let without_code = WorkflowError::retrieval(StoreError::Backend {
            code: None,
            message: "socket closed".into(),
        });
        assert_eq!(
            AppError::from(without_code).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn gate_failures_map_to_auth_statuses() {
        assert_eq!(
            AppError::from(WorkflowError::Unapproved("pending".into())).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(WorkflowError::Unauthenticated("no session".into())).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(WorkflowError::Conflict("taken".into())).status_code(),
            StatusCode::CONFLICT
        );
    }
}
