pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::retry::RetryPolicy;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{DirectoryConfig, SecurityConfig};
use crate::middleware::{require_role, RoleGuard, SESSION_COOKIE};
use crate::models::Role;
use crate::services::{
    AccessRequestStore, AccessRequestWorkflow, ContactDirectory, ContactStore, Diocese,
    EmailProvider, IdentityGateway, IdentityProvider, Notifier,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::signup::signup,
        handlers::auth::requests::get_user_request,
        handlers::auth::requests::list_user_requests,
        handlers::auth::requests::approve_user,
        handlers::auth::verify::verify,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::session::me,
        handlers::contacts::list_contacts,
        handlers::contacts::search_contacts,
        handlers::contacts::create_contact,
        handlers::directory::list_foranes,
        handlers::directory::get_forane,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::access::SignupRequest,
            dtos::access::AccessRequestView,
            dtos::access::UserRequestResponse,
            dtos::access::UserRequestListResponse,
            dtos::access::ApproveUserRequest,
            dtos::access::ApproveUserResponse,
            dtos::access::ApprovalData,
            dtos::access::VerifyRequest,
            dtos::session::LoginRequest,
            dtos::session::SessionUser,
            dtos::session::SessionResponse,
            dtos::contact::CreateContactRequest,
            dtos::contact::ContactView,
            dtos::contact::ContactListResponse,
            dtos::directory::ForaneSummary,
            dtos::directory::ForaneListResponse,
            dtos::directory::ForaneDetail,
            models::AccessStatus,
            models::Role,
            models::SearchScope,
            models::Forane,
            models::Parish,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Access Requests", description = "Sign-up, review and verification"),
        (name = "Session", description = "Login, logout and current user"),
        (name = "Contacts", description = "Contact persons by forane and parish"),
        (name = "Directory", description = "Forane and parish hierarchy"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: DirectoryConfig,
    pub access_requests: Arc<dyn AccessRequestStore>,
    pub email: Arc<dyn EmailProvider>,
    pub diocese: Arc<Diocese>,
    pub workflow: AccessRequestWorkflow,
    pub gateway: IdentityGateway,
    pub contacts: ContactDirectory,
    pub signup_rate_limiter: IpRateLimiter,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the domain services over the given collaborators.
    pub fn new(
        config: DirectoryConfig,
        access_requests: Arc<dyn AccessRequestStore>,
        contact_store: Arc<dyn ContactStore>,
        identity: Arc<dyn IdentityProvider>,
        email: Arc<dyn EmailProvider>,
        diocese: Arc<Diocese>,
    ) -> Self {
        let notifier = Notifier::new(
            email.clone(),
            config.workflow.admin_email.clone(),
            config.workflow.app_base_url.clone(),
            RetryPolicy::with_max_retries(config.smtp.max_retries),
        );
        let workflow = AccessRequestWorkflow::new(
            access_requests.clone(),
            identity.clone(),
            notifier,
            config.workflow.phone_country_code.clone(),
        );
        let gateway = IdentityGateway::new(identity, access_requests.clone());
        let contacts = ContactDirectory::new(contact_store, diocese.clone());

        let limits = &config.rate_limit;
        let signup_rate_limiter =
            create_ip_rate_limiter(limits.signup_attempts, limits.signup_window_seconds);
        let login_rate_limiter =
            create_ip_rate_limiter(limits.login_attempts, limits.login_window_seconds);
        let ip_rate_limiter =
            create_ip_rate_limiter(limits.global_ip_limit, limits.global_ip_window_seconds);

        Self {
            config,
            access_requests,
            email,
            diocese,
            workflow,
            gateway,
            contacts,
            signup_rate_limiter,
            login_rate_limiter,
            ip_rate_limiter,
        }
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ]);

    // credentials cannot be combined with a wildcard origin
    if security.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Review and approval require an administrator
    let admin_routes = Router::new()
        .route(
            "/api/auth/user-request/:request_id",
            get(handlers::auth::get_user_request),
        )
        .route("/api/auth/user-requests", get(handlers::auth::list_user_requests))
        .route("/api/auth/approve-user", post(handlers::auth::approve_user))
        .layer(from_fn_with_state(
            RoleGuard::new(state.gateway.clone(), Role::Admin),
            require_role,
        ));

    // Directory browsing requires any signed-in user
    let user_routes = Router::new()
        .route(
            "/api/contact-person",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route(
            "/api/contact-person/search",
            get(handlers::contacts::search_contacts),
        )
        .route("/api/foranes", get(handlers::directory::list_foranes))
        .route("/api/foranes/:id", get(handlers::directory::get_forane))
        .layer(from_fn_with_state(
            RoleGuard::new(state.gateway.clone(), Role::User),
            require_role,
        ));

    let signup_route = Router::new()
        .route("/api/auth/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(
            state.signup_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let login_route = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    if state.config.swagger.enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(signup_route)
        .merge(login_route)
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/verify", post(handlers::auth::verify))
        .merge(admin_routes)
        .merge(user_routes)
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security));

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Document store unreachable", body = ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.access_requests.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Document store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "mongodb": "up",
            "email": if state.email.is_enabled() { "smtp" } else { "disabled" },
            "foranes": state.diocese.foranes().len(),
        }
    })))
}
