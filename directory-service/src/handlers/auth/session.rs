use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::{
    dtos::{
        session::{LoginRequest, SessionResponse, SessionUser},
        MessageResponse,
    },
    middleware::{session_secret, SESSION_COOKIE},
    utils::ValidatedJson,
    AppState,
};

const SESSION_COOKIE_MAX_AGE_DAYS: i64 = 30;

fn session_cookie(secret: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, secret))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Log in with email and password
///
/// Only callers whose access request was approved get a session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established; session cookie set", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Access request not approved", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse)
    ),
    tag = "Session"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.gateway.login(&req.email, &req.password).await?;

    let user = SessionUser::from(&session.user);
    let jar = jar.add(session_cookie(
        session.secret,
        state.config.security.session_cookie_secure,
    ));

    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            user,
        }),
    ))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session destroyed or already gone", body = MessageResponse)
    ),
    tag = "Session"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(secret) = session_secret(&headers) {
        state.gateway.logout(&secret).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(MessageResponse::ok("Logged out successfully"))))
}

/// Current user and role
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Caller behind the session", body = SessionResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Session",
    security(("session_cookie" = []), ("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let secret = session_secret(&headers)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;
    let user = state.gateway.current_user(&secret).await?;

    Ok(Json(SessionResponse {
        success: true,
        user: SessionUser::from(&user),
    }))
}
