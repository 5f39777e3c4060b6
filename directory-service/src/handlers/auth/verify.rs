use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{access::VerifyRequest, MessageResponse},
    utils::ValidatedJson,
    AppState,
};

/// Complete email verification from the emailed link
#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Verification rejected by the identity provider", body = ErrorResponse),
        (status = 422, description = "Missing userId or secret", body = ErrorResponse)
    ),
    tag = "Access Requests"
)]
pub async fn verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = state
        .workflow
        .confirm_verification(&req.user_id, &req.secret)
        .await?;

    tracing::info!(user_id = %req.user_id, status = ?status, "Email verification completed");

    Ok(Json(MessageResponse::ok(
        "Email verified successfully. You can now log in.",
    )))
}
