//! Access request lifecycle: submission, review, provisioning and
//! verification.
//!
//! Every resolution runs in two phases. The durable part (claiming the
//! request, creating the account, the rejection write) decides the outcome
//! returned to the caller. Follow-up writes and emails are best-effort and
//! only logged when they fail.

use std::sync::Arc;
use uuid::Uuid;

use super::access_store::AccessRequestStore;
use super::error::WorkflowError;
use super::identity::{IdentityAccount, IdentityError, IdentityProvider, NewAccount};
use super::metrics;
use super::notifier::Notifier;
use crate::models::{AccessRequest, AccessStatus, Role};
use crate::utils::{generate_temporary_password, normalize_phone, TemporaryPassword};

/// Role granted to every account provisioned through approval.
pub const PROVISIONED_ROLE: Role = Role::SuperAdmin;

#[derive(Debug, Clone, Default)]
pub struct NewAccessRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
}

/// A reviewer's decision. Name and phone overrides fall back to the stored
/// request. The email is the join key to the provisioned account and must
/// match the stored one.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub approve: bool,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    pub request_id: String,
    pub status: AccessStatus,
    pub account_id: Option<String>,
}

#[derive(Clone)]
pub struct AccessRequestWorkflow {
    requests: Arc<dyn AccessRequestStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Notifier,
    phone_country_code: String,
}

impl AccessRequestWorkflow {
    pub fn new(
        requests: Arc<dyn AccessRequestStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Notifier,
        phone_country_code: impl Into<String>,
    ) -> Self {
        Self {
            requests,
            identity,
            notifier,
            phone_country_code: phone_country_code.into(),
        }
    }

    pub async fn submit(&self, input: NewAccessRequest) -> Result<AccessRequest, WorkflowError> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        let phone = input.phone.trim().to_string();
        let designation = input.designation.trim().to_string();

        if name.is_empty() || email.is_empty() || phone.is_empty() || designation.is_empty() {
            return Err(WorkflowError::Validation(
                "All fields are required".to_string(),
            ));
        }
        validate_contact_fields(&email, &phone)?;

        let request = AccessRequest::new(name, email, phone, designation);
        self.requests.insert(&request).await.map_err(|e| {
            tracing::error!(request_id = %request.id, error = %e, "Failed to store access request");
            WorkflowError::storage(e)
        })?;

        metrics::record_transition(AccessStatus::Pending.as_str());
        tracing::info!(request_id = %request.id, "Access request submitted");

        self.notifier.notify_admin(&request).await;
        Ok(request)
    }

    pub async fn fetch(&self, request_id: &str) -> Result<AccessRequest, WorkflowError> {
        self.requests
            .get(request_id)
            .await
            .map_err(WorkflowError::retrieval)?
            .ok_or_else(|| WorkflowError::NotFound("User request not found".to_string()))
    }

    pub async fn list(
        &self,
        status: Option<AccessStatus>,
    ) -> Result<Vec<AccessRequest>, WorkflowError> {
        self.requests
            .list(status)
            .await
            .map_err(WorkflowError::retrieval)
    }

    pub async fn resolve(
        &self,
        request_id: &str,
        resolution: Resolution,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let request = self.fetch(request_id).await?;

        if request.status != AccessStatus::Pending {
            return Err(WorkflowError::Conflict(format!(
                "User request is already {}",
                request.status
            )));
        }

        if let Some(email) = non_empty(resolution.email.clone()) {
            if !email.eq_ignore_ascii_case(&request.email) {
                return Err(WorkflowError::Validation(
                    "Email must match the address on the request".to_string(),
                ));
            }
        }

        let claim = Uuid::new_v4().to_string();
        let claimed = self
            .requests
            .claim(&request.id, &claim)
            .await
            .map_err(WorkflowError::storage)?;
        if !claimed {
            return Err(WorkflowError::Conflict(
                "User request is already being reviewed".to_string(),
            ));
        }

        if resolution.approve {
            self.approve(request, resolution, &claim).await
        } else {
            self.reject(request, &claim).await
        }
    }

    async fn approve(
        &self,
        request: AccessRequest,
        resolution: Resolution,
        claim: &str,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let name = non_empty(resolution.name).unwrap_or_else(|| request.name.clone());
        let phone = normalize_phone(
            &non_empty(resolution.phone).unwrap_or_else(|| request.phone.clone()),
            &self.phone_country_code,
        );
        let password = generate_temporary_password();

        let account = match self.provision(&request.email, &phone, &name, &password).await {
            Ok(account) => account,
            Err(err) => {
                tracing::error!(request_id = %request.id, error = %err, "Account provisioning failed");
                self.mark_failed(&request, claim).await;
                return Err(WorkflowError::Provisioning(
                    "Failed to create user account".to_string(),
                ));
            }
        };

        let transition = AccessStatus::Pending
            .transition_to(AccessStatus::Approved)?
            .with_account(account.id.clone());
        match self.requests.transition(&request.id, &transition).await {
            Ok(true) => metrics::record_transition(AccessStatus::Approved.as_str()),
            Ok(false) => tracing::warn!(
                request_id = %request.id,
                account_id = %account.id,
                "Access request changed before approval was recorded"
            ),
            Err(e) => {
                metrics::record_bookkeeping_failure("approve");
                tracing::error!(
                    request_id = %request.id,
                    account_id = %account.id,
                    error = %e,
                    "Failed to record approval; account already exists"
                )
            }
        }

        self.notifier
            .notify_approved(&request, Some(&password))
            .await;

        Ok(ResolveOutcome {
            request_id: request.id,
            status: AccessStatus::Approved,
            account_id: Some(account.id),
        })
    }

    async fn provision(
        &self,
        email: &str,
        phone: &str,
        name: &str,
        password: &TemporaryPassword,
    ) -> Result<IdentityAccount, IdentityError> {
        let account = self
            .identity
            .create_account(&NewAccount {
                email,
                phone,
                name,
                password,
            })
            .await?;

        if let Err(e) = self.identity.set_role(&account.id, PROVISIONED_ROLE).await {
            tracing::error!(account_id = %account.id, error = %e, "Failed to assign role to new account");
            return Err(e);
        }

        Ok(account)
    }

    /// Record a provisioning failure. When the request cannot be moved to
    /// `failed`, the review claim is released so it can be resolved again.
    async fn mark_failed(&self, request: &AccessRequest, claim: &str) {
        let recorded = match AccessStatus::Pending.transition_to(AccessStatus::Failed) {
            Ok(transition) => match self.requests.transition(&request.id, &transition).await {
                Ok(true) => {
                    metrics::record_transition(AccessStatus::Failed.as_str());
                    true
                }
                Ok(false) => {
                    tracing::warn!(request_id = %request.id, "Request left pending before failure was recorded");
                    false
                }
                Err(e) => {
                    metrics::record_bookkeeping_failure("mark_failed");
                    tracing::error!(request_id = %request.id, error = %e, "Failed to mark access request as failed");
                    false
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Unexpected transition table");
                false
            }
        };

        if !recorded {
            self.release(&request.id, claim).await;
        }
    }

    async fn release(&self, request_id: &str, claim: &str) {
        if let Err(e) = self.requests.release_claim(request_id, claim).await {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to release review claim");
        }
    }

    async fn reject(
        &self,
        request: AccessRequest,
        claim: &str,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let transition = AccessStatus::Pending.transition_to(AccessStatus::Rejected)?;

        match self.requests.transition(&request.id, &transition).await {
            Ok(true) => metrics::record_transition(AccessStatus::Rejected.as_str()),
            Ok(false) => {
                return Err(WorkflowError::Conflict(
                    "User request changed while it was being reviewed".to_string(),
                ))
            }
            Err(e) => {
                self.release(&request.id, claim).await;
                return Err(WorkflowError::storage(e));
            }
        }

        self.notifier.notify_rejected(&request).await;

        Ok(ResolveOutcome {
            request_id: request.id,
            status: AccessStatus::Rejected,
            account_id: None,
        })
    }

    /// Complete email verification for `user_id` and, when an approved
    /// request belongs to that account, mark it verified.
    ///
    /// Once the provider accepts the secret it is spent, so the request
    /// bookkeeping after it is best-effort: failures are logged and counted,
    /// and the call still succeeds with `None`.
    pub async fn confirm_verification(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Option<AccessStatus>, WorkflowError> {
        self.identity
            .confirm_verification(user_id, secret)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %user_id, error = %e, "Email verification rejected");
                WorkflowError::Validation(format!("Verification failed: {}", e))
            })?;

        let request = match self.requests.find_by_account(user_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::info!(user_id = %user_id, "Verified account has no access request");
                return Ok(None);
            }
            Err(e) => {
                metrics::record_bookkeeping_failure("verify");
                tracing::error!(user_id = %user_id, error = %e, "Failed to look up access request after verification");
                return Ok(None);
            }
        };

        if request.status != AccessStatus::Approved {
            return Ok(Some(request.status));
        }

        let transition = AccessStatus::Approved.transition_to(AccessStatus::Verified)?;
        match self.requests.transition(&request.id, &transition).await {
            Ok(true) => {
                metrics::record_transition(AccessStatus::Verified.as_str());
                Ok(Some(AccessStatus::Verified))
            }
            Ok(false) => Ok(self
                .requests
                .get(&request.id)
                .await
                .ok()
                .flatten()
                .map(|r| r.status)),
            Err(e) => {
                metrics::record_bookkeeping_failure("verify");
                tracing::error!(
                    request_id = %request.id,
                    user_id = %user_id,
                    error = %e,
                    "Failed to record verification"
                );
                Ok(None)
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_contact_fields(email: &str, phone: &str) -> Result<(), WorkflowError> {
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid_email {
        return Err(WorkflowError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    if phone.len() < 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(WorkflowError::Validation(
            "Phone number must be at least 10 digits".to_string(),
        ));
    }

    Ok(())
}
