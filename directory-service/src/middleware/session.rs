use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::models::{AuthenticatedUser, Role};
use crate::services::IdentityGateway;

/// Cookie carrying the identity provider's session secret.
pub const SESSION_COOKIE: &str = "directory_session";

/// Session secret from the session cookie, or an `Authorization: Bearer`
/// header when no cookie is present.
pub fn session_secret(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Role requirement for one route group.
#[derive(Clone)]
pub struct RoleGuard {
    pub gateway: IdentityGateway,
    pub required: Role,
}

impl RoleGuard {
    pub fn new(gateway: IdentityGateway, required: Role) -> Self {
        Self { gateway, required }
    }
}

/// Resolve the session into an [`AuthenticatedUser`] and enforce the
/// guard's role. The user is stored in request extensions.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = session_secret(req.headers()).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
    })?;

    let user = guard.gateway.current_user(&secret).await?;

    if let Err(e) = IdentityGateway::authorize(&user, guard.required) {
        tracing::warn!(
            user_id = %user.id,
            role = ?user.role,
            required = %guard.required,
            path = %req.uri().path(),
            "Insufficient role"
        );
        return Err(e.into());
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// The caller resolved by [`require_role`].
pub struct CurrentUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Authenticated user missing from request extensions"
                ))
            })
    }
}
