use std::sync::Arc;

use super::access_store::AccessRequestStore;
use super::error::WorkflowError;
use super::identity::{IdentityAccount, IdentityProvider};
use crate::models::{AccessRequest, AuthenticatedUser, Role};

/// A session that passed the approval gate.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub secret: String,
    pub user: AuthenticatedUser,
}

/// Session handling and authorization on top of the identity provider.
#[derive(Clone)]
pub struct IdentityGateway {
    identity: Arc<dyn IdentityProvider>,
    requests: Arc<dyn AccessRequestStore>,
}

impl IdentityGateway {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        requests: Arc<dyn AccessRequestStore>,
    ) -> Self {
        Self { identity, requests }
    }

    /// Create a session and admit it only when the caller's access request
    /// has been approved. Rejected sessions are destroyed before returning.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<EstablishedSession, WorkflowError> {
        let email = email.trim().to_lowercase();
        let session = self
            .identity
            .create_session(&email, password)
            .await
            .map_err(WorkflowError::from_session)?;

        let account = match self.identity.current_account(&session.secret).await {
            Ok(account) => account,
            Err(e) => {
                self.discard(&session.secret).await;
                return Err(WorkflowError::from_session(e));
            }
        };

        if let Err(e) = self.approval_gate(&account).await {
            tracing::warn!(account_id = %account.id, error = %e, "Login refused by approval gate");
            self.discard(&session.secret).await;
            return Err(e);
        }

        let user = to_user(account);
        tracing::info!(user_id = %user.id, "Session established");
        Ok(EstablishedSession {
            secret: session.secret,
            user,
        })
    }

    async fn approval_gate(&self, account: &IdentityAccount) -> Result<(), WorkflowError> {
        let lookup = if account.email.is_empty() {
            Vec::new()
        } else {
            self.requests
                .list_by_email(&account.email)
                .await
                .map_err(WorkflowError::retrieval)?
        };

        match select_request(lookup) {
            None => Err(WorkflowError::Unapproved(
                "User record not found".to_string(),
            )),
            Some(request) if !request.status.grants_access() => Err(WorkflowError::Unapproved(
                "Your account is pending approval".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }

    async fn discard(&self, secret: &str) {
        if let Err(e) = self.identity.delete_session(secret).await {
            tracing::warn!(error = %e, "Failed to destroy session");
        }
    }

    /// Destroy the session. Unknown or expired sessions are not an error.
    pub async fn logout(&self, secret: &str) -> Result<(), WorkflowError> {
        self.identity
            .delete_session(secret)
            .await
            .map_err(WorkflowError::from_session)
    }

    pub async fn current_user(&self, secret: &str) -> Result<AuthenticatedUser, WorkflowError> {
        let account = self
            .identity
            .current_account(secret)
            .await
            .map_err(WorkflowError::from_session)?;
        Ok(to_user(account))
    }

    pub fn authorize(user: &AuthenticatedUser, required: Role) -> Result<(), WorkflowError> {
        if user.has_role(required) {
            return Ok(());
        }
        Err(WorkflowError::Forbidden(format!(
            "Requires {} role",
            required
        )))
    }
}

/// Prefer a record that grants access; otherwise the newest one decides.
fn select_request(mut requests: Vec<AccessRequest>) -> Option<AccessRequest> {
    match requests.iter().position(|r| r.status.grants_access()) {
        Some(index) => Some(requests.swap_remove(index)),
        None => requests.into_iter().next(),
    }
}

fn to_user(account: IdentityAccount) -> AuthenticatedUser {
    let role = Role::from_claim(account.role_claim());
    if role.is_none() {
        tracing::warn!(account_id = %account.id, claim = ?account.role_claim(), "Unrecognised role claim");
    }
    AuthenticatedUser {
        id: account.id,
        email: account.email,
        name: account.name,
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessStatus, StatusTransition};
    use crate::services::access_store::InMemoryAccessRequestStore;
    use crate::services::identity::MockIdentityProvider;

    struct Fixture {
        identity: Arc<MockIdentityProvider>,
        store: Arc<InMemoryAccessRequestStore>,
        gateway: IdentityGateway,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(InMemoryAccessRequestStore::new());
        let gateway = IdentityGateway::new(identity.clone(), store.clone());
        Fixture {
            identity,
            store,
            gateway,
        }
    }

    async fn seed_request(store: &InMemoryAccessRequestStore, email: &str, to: Option<AccessStatus>) {
        let request = AccessRequest::new(
            "A B".into(),
            email.into(),
            "9999999999".into(),
            "Member".into(),
        );
        store.insert(&request).await.unwrap();
        if let Some(to) = to {
            let transition: StatusTransition = AccessStatus::Pending.transition_to(to).unwrap();
            assert!(store.transition(&request.id, &transition).await.unwrap());
        }
    }

    #[tokio::test]
    async fn approved_user_gets_a_session() {
        let f = fixture();
        f.identity
            .seed_account("a@b.com", "secret-pw", "A B", Some("super_admin"));
        seed_request(&f.store, "a@b.com", Some(AccessStatus::Approved)).await;

        let session = f.gateway.login("A@B.com ", "secret-pw").await.unwrap();
        assert_eq!(session.user.role, Some(Role::SuperAdmin));
        assert_eq!(f.identity.active_sessions(), 1);

        let current = f.gateway.current_user(&session.secret).await.unwrap();
        assert_eq!(current.email, "a@b.com");
    }

    #[tokio::test]
    async fn login_without_request_destroys_session() {
        let f = fixture();
        f.identity.seed_account("a@b.com", "pw", "A B", None);

        let err = f.gateway.login("a@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Unapproved(_)));
        assert_eq!(f.identity.active_sessions(), 0);
    }

    #[tokio::test]
    async fn pending_request_is_refused() {
        let f = fixture();
        f.identity.seed_account("a@b.com", "pw", "A B", None);
        seed_request(&f.store, "a@b.com", None).await;

        let err = f.gateway.login("a@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Unapproved(ref m) if m.contains("pending")));
        assert_eq!(f.identity.active_sessions(), 0);
    }

    #[tokio::test]
    async fn older_rejection_does_not_mask_later_approval() {
        let f = fixture();
        f.identity.seed_account("a@b.com", "pw", "A B", None);
        seed_request(&f.store, "a@b.com", Some(AccessStatus::Verified)).await;
        seed_request(&f.store, "a@b.com", Some(AccessStatus::Rejected)).await;

        assert!(f.gateway.login("a@b.com", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthenticated() {
        let f = fixture();
        f.identity.seed_account("a@b.com", "pw", "A B", None);

        let err = f.gateway.login("a@b.com", "nope").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let f = fixture();
        f.gateway.logout("unknown").await.unwrap();
        f.gateway.logout("unknown").await.unwrap();
    }

    #[test]
    fn authorize_follows_hierarchy() {
        let user = AuthenticatedUser {
            id: "u".into(),
            email: "a@b.com".into(),
            name: "A".into(),
            role: Some(Role::Admin),
        };
        assert!(IdentityGateway::authorize(&user, Role::User).is_ok());
        assert!(IdentityGateway::authorize(&user, Role::Admin).is_ok());
        assert!(matches!(
            IdentityGateway::authorize(&user, Role::SuperAdmin),
            Err(WorkflowError::Forbidden(_))
        ));

        let unknown = AuthenticatedUser { role: None, ..user };
        assert!(IdentityGateway::authorize(&unknown, Role::User).is_err());
    }
}
