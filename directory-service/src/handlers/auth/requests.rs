use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::access::{
        AccessRequestView, ApprovalData, ApproveUserRequest, ApproveUserResponse,
        ListRequestsQuery, UserRequestListResponse, UserRequestResponse,
    },
    middleware::CurrentUser,
    models::AccessStatus,
    services::Resolution,
    utils::ValidatedJson,
    AppState,
};

/// Fetch one access request
#[utoipa::path(
    get,
    path = "/api/auth/user-request/{request_id}",
    params(("request_id" = String, Path, description = "Access request identifier")),
    responses(
        (status = 200, description = "Access request", body = UserRequestResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Unknown request", body = ErrorResponse)
    ),
    tag = "Access Requests",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn get_user_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.workflow.fetch(&request_id).await?;
    Ok(Json(UserRequestResponse {
        success: true,
        user_request: request.into(),
    }))
}

/// List access requests, newest first
#[utoipa::path(
    get,
    path = "/api/auth/user-requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Access requests", body = UserRequestListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "Access Requests",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn list_user_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<AccessStatus>()
                .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?,
        ),
        None => None,
    };

    let user_requests: Vec<AccessRequestView> = state
        .workflow
        .list(status)
        .await?
        .into_iter()
        .map(AccessRequestView::from)
        .collect();

    Ok(Json(UserRequestListResponse {
        success: true,
        total: user_requests.len(),
        user_requests,
    }))
}

/// Approve or reject a pending access request
#[utoipa::path(
    post,
    path = "/api/auth/approve-user",
    request_body = ApproveUserRequest,
    responses(
        (status = 200, description = "Request resolved", body = ApproveUserResponse),
        (status = 400, description = "Email differs from the request", body = ErrorResponse),
        (status = 404, description = "Unknown request", body = ErrorResponse),
        (status = 409, description = "Request is no longer pending", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Account could not be provisioned", body = ErrorResponse)
    ),
    tag = "Access Requests",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn approve_user(
    State(state): State<AppState>,
    CurrentUser(reviewer): CurrentUser,
    ValidatedJson(req): ValidatedJson<ApproveUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(
        request_id = %req.request_id,
        reviewer = %reviewer.id,
        approved = req.approved,
        "Resolving access request"
    );

    let outcome = state
        .workflow
        .resolve(
            &req.request_id,
            Resolution {
                approve: req.approved,
                email: req.email,
                name: req.name,
                phone: req.phone,
            },
        )
        .await?;

    let verb = if outcome.status == AccessStatus::Approved {
        "approved"
    } else {
        "rejected"
    };

    Ok((
        StatusCode::OK,
        Json(ApproveUserResponse {
            success: true,
            message: format!("User request {} successfully", verb),
            data: ApprovalData {
                user_id: outcome.account_id,
                status: outcome.status,
            },
        }),
    ))
}
