use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::contact::{
        ContactListQuery, ContactListResponse, ContactSearchQuery, ContactView,
        CreateContactRequest,
    },
    middleware::CurrentUser,
    models::{ContactFilter, SearchScope},
    services::NewContact,
    utils::ValidatedJson,
    AppState,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// List contact persons, optionally by forane and parish
#[utoipa::path(
    get,
    path = "/api/contact-person",
    params(ContactListQuery),
    responses(
        (status = 200, description = "Matching contact persons", body = ContactListResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Contacts",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ContactFilter {
        forane: non_blank(query.forane),
        parish: non_blank(query.parish),
    };
    let contacts = state.contacts.list(&filter).await?;
    Ok(Json(ContactListResponse::from(contacts)))
}

/// Search contact persons by forane or parish
#[utoipa::path(
    get,
    path = "/api/contact-person/search",
    params(ContactSearchQuery),
    responses(
        (status = 200, description = "At most 50 matches; empty for queries under two characters", body = ContactListResponse)
    ),
    tag = "Contacts",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn search_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    // anything other than forane/parish searches both fields
    let scope = query
        .scope
        .as_deref()
        .and_then(|s| s.trim().parse::<SearchScope>().ok())
        .unwrap_or_default();

    let q = query.q.unwrap_or_default();
    let contacts = state.contacts.search(&q, scope).await?;
    Ok(Json(ContactListResponse::from(contacts)))
}

/// Create a contact person
#[utoipa::path(
    post,
    path = "/api/contact-person",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Stored contact person", body = ContactView),
        (status = 400, description = "Unknown forane or parish, or malformed field", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Contacts",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn create_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = state
        .contacts
        .create(NewContact {
            name: req.name,
            contact_number: req.contact_number,
            forane: req.forane,
            parish: req.parish,
            dob: req.dob,
        })
        .await?;

    tracing::debug!(contact_id = %contact.id, created_by = %user.id, "Contact created via API");
    Ok((StatusCode::CREATED, Json(ContactView::from(contact))))
}
