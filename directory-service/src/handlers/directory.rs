use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::directory::{ForaneDetail, ForaneListResponse, ForaneQuery, ForaneSummary},
    AppState,
};

/// List foranes, optionally filtered by name
#[utoipa::path(
    get,
    path = "/api/foranes",
    params(ForaneQuery),
    responses(
        (status = 200, description = "Foranes in directory order", body = ForaneListResponse)
    ),
    tag = "Directory",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn list_foranes(
    State(state): State<AppState>,
    Query(query): Query<ForaneQuery>,
) -> impl IntoResponse {
    let foranes: Vec<ForaneSummary> = state
        .diocese
        .search(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(ForaneSummary::from)
        .collect();

    Json(ForaneListResponse {
        total: foranes.len(),
        foranes,
    })
}

/// Forane with its parishes
#[utoipa::path(
    get,
    path = "/api/foranes/{id}",
    params(("id" = String, Path, description = "Forane identifier")),
    responses(
        (status = 200, description = "Forane and ordered parishes", body = ForaneDetail),
        (status = 404, description = "Unknown forane", body = ErrorResponse)
    ),
    tag = "Directory",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn get_forane(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let forane = state
        .diocese
        .forane(&id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Forane not found")))?;
    Ok(Json(ForaneDetail::from(forane)))
}
