use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{access::SignupRequest, MessageResponse},
    services::NewAccessRequest,
    utils::ValidatedJson,
    AppState,
};

/// Submit a request for directory access
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Request stored and administrator notified", body = MessageResponse),
        (status = 400, description = "Missing or malformed field", body = ErrorResponse),
        (status = 429, description = "Too many sign-up attempts", body = ErrorResponse),
        (status = 500, description = "Request could not be stored", body = ErrorResponse)
    ),
    tag = "Access Requests"
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .workflow
        .submit(NewAccessRequest {
            name: req.name,
            email: req.email,
            phone: req.phone,
            designation: req.designation,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::ok(
            "Access request submitted successfully. An administrator will review your request.",
        )),
    ))
}
