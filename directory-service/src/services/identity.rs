//! Identity provider boundary: accounts, sessions, role preferences and
//! email verification.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use service_core::retry::{retry_async, RetryPolicy, Retryable};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::models::Role;
use crate::utils::TemporaryPassword;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session is missing or expired")]
    Unauthenticated,

    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Identity provider timed out")]
    Timeout,

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Unexpected identity provider response: {0}")]
    Decode(String),
}

impl IdentityError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            IdentityError::InvalidCredentials | IdentityError::Unauthenticated => Some(401),
            IdentityError::Rejected { status, .. } => Some(*status),
            IdentityError::Timeout => Some(504),
            IdentityError::Transport(_) => Some(502),
            IdentityError::Decode(_) => None,
        }
    }
}

impl Retryable for IdentityError {
    fn is_retryable(&self) -> bool {
        match self {
            IdentityError::Timeout | IdentityError::Transport(_) => true,
            IdentityError::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdentityError::Timeout
        } else if err.is_decode() {
            IdentityError::Decode(err.to_string())
        } else {
            IdentityError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub prefs: Value,
}

impl IdentityAccount {
    /// Raw `role` preference, if set.
    pub fn role_claim(&self) -> Option<&str> {
        self.prefs.get("role").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub id: String,
    pub account_id: String,
    pub secret: String,
}

pub struct NewAccount<'a> {
    pub email: &'a str,
    pub phone: &'a str,
    pub name: &'a str,
    pub password: &'a TemporaryPassword,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. Never retried.
    async fn create_account(&self, account: &NewAccount<'_>)
        -> Result<IdentityAccount, IdentityError>;

    async fn set_role(&self, account_id: &str, role: Role) -> Result<(), IdentityError>;

    async fn create_session(&self, email: &str, password: &str)
        -> Result<IdentitySession, IdentityError>;

    async fn current_account(&self, session_secret: &str)
        -> Result<IdentityAccount, IdentityError>;

    /// Succeeds when the session is already gone.
    async fn delete_session(&self, session_secret: &str) -> Result<(), IdentityError>;

    async fn confirm_verification(&self, user_id: &str, secret: &str)
        -> Result<(), IdentityError>;
}

#[derive(Deserialize)]
struct AccountPayload {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    prefs: Value,
}

impl From<AccountPayload> for IdentityAccount {
    fn from(payload: AccountPayload) -> Self {
        Self {
            id: payload.id,
            email: payload.email,
            name: payload.name,
            prefs: payload.prefs,
        }
    }
}

#[derive(Deserialize)]
struct SessionPayload {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    secret: String,
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

/// REST client for an Appwrite-compatible identity service.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: SecretString,
    read_retry: RetryPolicy,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            read_retry: RetryPolicy::with_max_retries(config.max_retries),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project_id)
    }

    fn server_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .header("X-Appwrite-Key", self.api_key.expose_secret())
    }

    fn session_request(&self, method: Method, path: &str, secret: &str) -> RequestBuilder {
        self.request(method, path)
            .header("X-Appwrite-Session", secret)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, IdentityError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(IdentityError::from);
        }

        let payload = response.json::<ErrorPayload>().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::Unauthenticated);
        }
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message: payload.message,
        })
    }

    async fn fetch_account(&self, session_secret: &str) -> Result<IdentityAccount, IdentityError> {
        let payload: AccountPayload =
            Self::send(self.session_request(Method::GET, "/account", session_secret)).await?;
        Ok(payload.into())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
    ) -> Result<IdentityAccount, IdentityError> {
        let body = json!({
            "userId": "unique()",
            "email": account.email,
            "phone": account.phone,
            "password": account.password.expose(),
            "name": account.name,
        });

        let payload: AccountPayload =
            Self::send(self.server_request(Method::POST, "/users").json(&body)).await?;
        tracing::info!(account_id = %payload.id, "Identity account created");
        Ok(payload.into())
    }

    async fn set_role(&self, account_id: &str, role: Role) -> Result<(), IdentityError> {
        let path = format!("/users/{}/prefs", account_id);
        let _: Value = Self::send(
            self.server_request(Method::PATCH, &path)
                .json(&json!({ "prefs": { "role": role.as_str() } })),
        )
        .await?;
        Ok(())
    }

    async fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let result: Result<SessionPayload, IdentityError> = Self::send(
            self.server_request(Method::POST, "/account/sessions/email")
                .json(&json!({ "email": email, "password": password })),
        )
        .await;

        match result {
            Ok(payload) => Ok(IdentitySession {
                id: payload.id,
                account_id: payload.user_id,
                secret: payload.secret,
            }),
            Err(IdentityError::Unauthenticated) => Err(IdentityError::InvalidCredentials),
            Err(e) => Err(e),
        }
    }

    async fn current_account(
        &self,
        session_secret: &str,
    ) -> Result<IdentityAccount, IdentityError> {
        retry_async(&self.read_retry, "identity.current_account", || {
            self.fetch_account(session_secret)
        })
        .await
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), IdentityError> {
        let request =
            self.session_request(Method::DELETE, "/account/sessions/current", session_secret);
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND
        {
            return Ok(());
        }

        let payload = response.json::<ErrorPayload>().await.unwrap_or_default();
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message: payload.message,
        })
    }

    async fn confirm_verification(&self, user_id: &str, secret: &str) -> Result<(), IdentityError> {
        let _: Value = Self::send(
            self.request(Method::PUT, "/account/verification")
                .json(&json!({ "userId": user_id, "secret": secret })),
        )
        .await?;
        Ok(())
    }
}

struct MockAccount {
    account: IdentityAccount,
    password: String,
    phone: String,
}

#[derive(Default)]
struct MockIdentityState {
    accounts: HashMap<String, MockAccount>,
    sessions: HashMap<String, String>,
    verifications: HashMap<String, String>,
}

/// In-process identity provider for tests and offline runs.
#[derive(Default)]
pub struct MockIdentityProvider {
    state: Mutex<MockIdentityState>,
    fail_account_creation: AtomicBool,
    create_calls: AtomicU64,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockIdentityState>, IdentityError> {
        self.state
            .lock()
            .map_err(|e| IdentityError::Transport(format!("Mock identity mutex poisoned: {}", e)))
    }

    /// Register an account directly; returns its id.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Option<&str>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let prefs = match role {
            Some(role) => json!({ "role": role }),
            None => json!({}),
        };
        if let Ok(mut state) = self.lock() {
            state.accounts.insert(
                id.clone(),
                MockAccount {
                    account: IdentityAccount {
                        id: id.clone(),
                        email: email.to_lowercase(),
                        name: name.to_string(),
                        prefs,
                    },
                    password: password.to_string(),
                    phone: String::new(),
                },
            );
        }
        id
    }

    pub fn fail_account_creation(&self, fail: bool) {
        self.fail_account_creation.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_account` calls, successful or not.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn account_by_email(&self, email: &str) -> Option<IdentityAccount> {
        let state = self.lock().ok()?;
        state
            .accounts
            .values()
            .find(|a| a.account.email.eq_ignore_ascii_case(email))
            .map(|a| a.account.clone())
    }

    pub fn password_of(&self, account_id: &str) -> Option<String> {
        let state = self.lock().ok()?;
        state.accounts.get(account_id).map(|a| a.password.clone())
    }

    pub fn phone_of(&self, account_id: &str) -> Option<String> {
        let state = self.lock().ok()?;
        state.accounts.get(account_id).map(|a| a.phone.clone())
    }

    pub fn active_sessions(&self) -> usize {
        self.lock().map(|s| s.sessions.len()).unwrap_or(0)
    }

    /// Issue a verification secret for `account_id`, as the provider would
    /// when mailing a confirmation link.
    pub fn issue_verification(&self, account_id: &str) -> String {
        let secret = Uuid::new_v4().simple().to_string();
        if let Ok(mut state) = self.lock() {
            state
                .verifications
                .insert(account_id.to_string(), secret.clone());
        }
        secret
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
    ) -> Result<IdentityAccount, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_account_creation.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                status: 500,
                message: "mock provider refused account creation".to_string(),
            });
        }

        let mut state = self.lock()?;
        if state
            .accounts
            .values()
            .any(|a| a.account.email.eq_ignore_ascii_case(account.email))
        {
            return Err(IdentityError::Rejected {
                status: 409,
                message: "A user with the same email already exists".to_string(),
            });
        }

        let created = IdentityAccount {
            id: Uuid::new_v4().to_string(),
            email: account.email.to_lowercase(),
            name: account.name.to_string(),
            prefs: json!({}),
        };
        state.accounts.insert(
            created.id.clone(),
            MockAccount {
                account: created.clone(),
                password: account.password.expose().to_string(),
                phone: account.phone.to_string(),
            },
        );
        Ok(created)
    }

    async fn set_role(&self, account_id: &str, role: Role) -> Result<(), IdentityError> {
        let mut state = self.lock()?;
        let entry = state
            .accounts
            .get_mut(account_id)
            .ok_or(IdentityError::Rejected {
                status: 404,
                message: "User not found".to_string(),
            })?;
        entry.account.prefs = json!({ "role": role.as_str() });
        Ok(())
    }

    async fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let mut state = self.lock()?;
        let account_id = state
            .accounts
            .values()
            .find(|a| a.account.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or(IdentityError::InvalidCredentials)?;

        let session = IdentitySession {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.clone(),
            secret: Uuid::new_v4().simple().to_string(),
        };
        state.sessions.insert(session.secret.clone(), account_id);
        Ok(session)
    }

    async fn current_account(
        &self,
        session_secret: &str,
    ) -> Result<IdentityAccount, IdentityError> {
        let state = self.lock()?;
        state
            .sessions
            .get(session_secret)
            .and_then(|id| state.accounts.get(id))
            .map(|a| a.account.clone())
            .ok_or(IdentityError::Unauthenticated)
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), IdentityError> {
        self.lock()?.sessions.remove(session_secret);
        Ok(())
    }

    async fn confirm_verification(&self, user_id: &str, secret: &str) -> Result<(), IdentityError> {
        let mut state = self.lock()?;
        match state.verifications.get(user_id) {
            Some(expected) if expected == secret => {
                state.verifications.remove(user_id);
                Ok(())
            }
            _ => Err(IdentityError::Rejected {
                status: 401,
                message: "Invalid token passed in the request".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_temporary_password;

    #[test]
    fn retry_classification_only_covers_transient_faults() {
        assert!(IdentityError::Timeout.is_retryable());
        assert!(IdentityError::Transport("reset".into()).is_retryable());
        assert!(IdentityError::Rejected {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!IdentityError::Rejected {
            status: 409,
            message: String::new()
        }
        .is_retryable());
        assert!(!IdentityError::Unauthenticated.is_retryable());
    }

    #[test]
    fn role_claim_reads_preferences() {
        let account = IdentityAccount {
            id: "u1".into(),
            email: "a@b.com".into(),
            name: "A".into(),
            prefs: json!({ "role": "admin" }),
        };
        assert_eq!(account.role_claim(), Some("admin"));

        let empty = IdentityAccount {
            prefs: json!([]),
            ..account
        };
        assert_eq!(empty.role_claim(), None);
    }

    #[tokio::test]
    async fn mock_sessions_follow_account_lifecycle() {
        let provider = MockIdentityProvider::new();
        let password = generate_temporary_password();
        let account = provider
            .create_account(&NewAccount {
                email: "New@Example.com",
                phone: "+919999999999",
                name: "New",
                password: &password,
            })
            .await
            .unwrap();
        provider.set_role(&account.id, Role::SuperAdmin).await.unwrap();

        let session = provider
            .create_session("new@example.com", password.expose())
            .await
            .unwrap();
        let current = provider.current_account(&session.secret).await.unwrap();
        assert_eq!(current.role_claim(), Some("super_admin"));

        provider.delete_session(&session.secret).await.unwrap();
        provider.delete_session(&session.secret).await.unwrap();
        assert!(matches!(
            provider.current_account(&session.secret).await,
            Err(IdentityError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn mock_verification_requires_issued_secret() {
        let provider = MockIdentityProvider::new();
        let id = provider.seed_account("a@b.com", "pw", "A", None);
        assert!(provider.confirm_verification(&id, "guess").await.is_err());

        let secret = provider.issue_verification(&id);
        provider.confirm_verification(&id, &secret).await.unwrap();
    }
}
