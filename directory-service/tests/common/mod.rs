//! Shared setup for directory-service integration tests.
//!
//! Builds the full router over in-memory stores, the mock identity provider
//! and the recording mock email provider. No external services are needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use directory_service::{
    build_router,
    config::{
        DirectoryConfig, Environment, IdentityConfig, MongoConfig, RateLimitConfig,
        SecurityConfig, SmtpConfig, SwaggerConfig, WorkflowConfig,
    },
    models::{AccessRequest, AccessStatus},
    services::{
        AccessRequestStore, Diocese, InMemoryAccessRequestStore, InMemoryContactStore,
        MockEmailProvider, MockIdentityProvider,
    },
    AppState,
};
use secrecy::SecretString;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const REVIEWER_EMAIL: &str = "reviewer@example.com";
pub const REVIEWER_PASSWORD: &str = "reviewer-password";
pub const MEMBER_EMAIL: &str = "member@example.com";
pub const MEMBER_PASSWORD: &str = "member-password";

pub fn test_config() -> DirectoryConfig {
    DirectoryConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "directory-service".into(),
        service_version: "test".into(),
        log_level: "info".into(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".into(),
            database: "directory_test".into(),
            timeout_seconds: 1,
        },
        identity: IdentityConfig {
            endpoint: "http://identity.invalid/v1".into(),
            project_id: "test".into(),
            api_key: SecretString::new("test-key".into()),
            timeout_seconds: 1,
            max_retries: 0,
        },
        smtp: SmtpConfig {
            enabled: false,
            host: "localhost".into(),
            port: 587,
            user: String::new(),
            password: SecretString::new(String::new()),
            from_email: "no-reply@example.com".into(),
            from_name: "Diocese Directory".into(),
            timeout_seconds: 1,
            max_retries: 0,
        },
        workflow: WorkflowConfig {
            admin_email: ADMIN_EMAIL.into(),
            app_base_url: "https://directory.example.com".into(),
            phone_country_code: "+91".into(),
            diocese_data_path: None,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".into()],
            session_cookie_secure: false,
        },
        swagger: SwaggerConfig { enabled: false },
        rate_limit: RateLimitConfig {
            signup_attempts: 1000,
            signup_window_seconds: 60,
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 10000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("directory_session="))
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub requests: Arc<InMemoryAccessRequestStore>,
    pub contacts: Arc<InMemoryContactStore>,
    pub identity: Arc<MockIdentityProvider>,
    pub email: Arc<MockEmailProvider>,
    /// Session of an approved administrator.
    pub admin_session: String,
    /// Session of an approved user without an elevated role.
    pub member_session: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: DirectoryConfig) -> Self {
        let requests = Arc::new(InMemoryAccessRequestStore::new());
        let contacts = Arc::new(InMemoryContactStore::new());
        let identity = Arc::new(MockIdentityProvider::new());
        let email = Arc::new(MockEmailProvider::new());
        let diocese = Arc::new(Diocese::embedded().unwrap());

        let state = AppState::new(
            config,
            requests.clone(),
            contacts.clone(),
            identity.clone(),
            email.clone(),
            diocese,
        );

        identity.seed_account(REVIEWER_EMAIL, REVIEWER_PASSWORD, "Reviewer", Some("admin"));
        seed_approved_request(&requests, REVIEWER_EMAIL).await;
        identity.seed_account(MEMBER_EMAIL, MEMBER_PASSWORD, "Member", None);
        seed_approved_request(&requests, MEMBER_EMAIL).await;

        let admin_session = state
            .gateway
            .login(REVIEWER_EMAIL, REVIEWER_PASSWORD)
            .await
            .unwrap()
            .secret;
        let member_session = state
            .gateway
            .login(MEMBER_EMAIL, MEMBER_PASSWORD)
            .await
            .unwrap()
            .secret;

        let router = build_router(state.clone()).await.unwrap();

        Self {
            router,
            state,
            requests,
            contacts,
            identity,
            email,
            admin_session,
            member_session,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        if let Some(secret) = session {
            builder = builder.header(header::COOKIE, format!("directory_session={}", secret));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, session).await
    }

    pub async fn post(&self, uri: &str, body: Value, session: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), session).await
    }

    /// Submit a sign-up and return the stored request id.
    pub async fn signup(&self, email: &str) -> String {
        let res = self
            .post(
                "/api/auth/signup",
                serde_json::json!({
                    "name": "A B",
                    "email": email,
                    "phone": "9999999999",
                    "designation": "Member"
                }),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "signup failed: {}", res.body);

        self.requests
            .list_by_email(email)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
            .id
    }

    pub async fn stored_status(&self, request_id: &str) -> AccessStatus {
        self.requests.get(request_id).await.unwrap().unwrap().status
    }

    pub fn emails_with_subject(&self, subject: &str) -> usize {
        self.email
            .sent()
            .iter()
            .filter(|m| m.subject == subject)
            .count()
    }
}

async fn seed_approved_request(store: &InMemoryAccessRequestStore, email: &str) {
    let mut request = AccessRequest::new(
        "Seeded".into(),
        email.into(),
        "9999999999".into(),
        "Coordinator".into(),
    );
    request.status = AccessStatus::Approved;
    store.insert(&request).await.unwrap();
}
