use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of an access request.
///
/// Requests are created `pending` and only ever move along
/// `pending -> approved | rejected | failed` and `approved -> verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Pending,
    Approved,
    Rejected,
    Verified,
    Failed,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Pending => "pending",
            AccessStatus::Approved => "approved",
            AccessStatus::Rejected => "rejected",
            AccessStatus::Verified => "verified",
            AccessStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(self, next: AccessStatus) -> bool {
        matches!(
            (self, next),
            (
                AccessStatus::Pending,
                AccessStatus::Approved | AccessStatus::Rejected | AccessStatus::Failed
            ) | (AccessStatus::Approved, AccessStatus::Verified)
        )
    }

    /// Whether a holder of this request may sign in.
    pub fn grants_access(self) -> bool {
        matches!(self, AccessStatus::Approved | AccessStatus::Verified)
    }

    /// Build a guarded status write from `self` to `next`.
    pub fn transition_to(self, next: AccessStatus) -> Result<StatusTransition, InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self,
                to: next,
            });
        }

        Ok(StatusTransition {
            from: self,
            to: next,
            account_id: None,
            at: Utc::now(),
        })
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AccessStatus::Pending),
            "approved" => Ok(AccessStatus::Approved),
            "rejected" => Ok(AccessStatus::Rejected),
            "verified" => Ok(AccessStatus::Verified),
            "failed" => Ok(AccessStatus::Failed),
            _ => Err(format!("Invalid access request status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Access request cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: AccessStatus,
    pub to: AccessStatus,
}

/// A compare-and-set status write: applied only while the stored status
/// still equals `from`.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    from: AccessStatus,
    to: AccessStatus,
    account_id: Option<String>,
    at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn from(&self) -> AccessStatus {
        self.from
    }

    pub fn to(&self) -> AccessStatus {
        self.to
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Apply the write to an in-memory copy of the record.
    pub fn apply(&self, request: &mut AccessRequest) {
        request.status = self.to;
        request.updated_at = Some(self.at);
        if let Some(account_id) = &self.account_id {
            request.account_id = Some(account_id.clone());
        }
        if self.to == AccessStatus::Verified {
            request.verified_at = Some(self.at);
        }
    }
}

/// One person's request for access, as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub status: AccessStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// Set once a reviewer has taken the request; never cleared on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_claim: Option<String>,
}

impl AccessRequest {
    pub fn new(name: String, email: String, phone: String, designation: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            phone,
            designation,
            status: AccessStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            account_id: None,
            verified_at: None,
            review_claim: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AccessStatus; 5] = [
        AccessStatus::Pending,
        AccessStatus::Approved,
        AccessStatus::Rejected,
        AccessStatus::Verified,
        AccessStatus::Failed,
    ];

    #[test]
    fn only_documented_transitions_are_allowed() {
        let allowed = [
            (AccessStatus::Pending, AccessStatus::Approved),
            (AccessStatus::Pending, AccessStatus::Rejected),
            (AccessStatus::Pending, AccessStatus::Failed),
            (AccessStatus::Approved, AccessStatus::Verified),
        ];

        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn transition_to_rejects_illegal_moves() {
        let err = AccessStatus::Rejected
            .transition_to(AccessStatus::Approved)
            .unwrap_err();
        assert_eq!(err.from, AccessStatus::Rejected);
        assert_eq!(err.to, AccessStatus::Approved);
    }

    #[test]
    fn apply_records_account_and_verification_time() {
        let mut request = AccessRequest::new(
            "A B".into(),
            "a@b.com".into(),
            "9999999999".into(),
            "Member".into(),
        );

        AccessStatus::Pending
            .transition_to(AccessStatus::Approved)
            .unwrap()
            .with_account("acct-1")
            .apply(&mut request);
        assert_eq!(request.status, AccessStatus::Approved);
        assert_eq!(request.account_id.as_deref(), Some("acct-1"));
        assert!(request.verified_at.is_none());

        AccessStatus::Approved
            .transition_to(AccessStatus::Verified)
            .unwrap()
            .apply(&mut request);
        assert_eq!(request.status, AccessStatus::Verified);
        assert!(request.verified_at.is_some());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Pending".parse::<AccessStatus>(), Ok(AccessStatus::Pending));
        assert!("archived".parse::<AccessStatus>().is_err());
    }

    #[test]
    fn stored_document_round_trips_through_bson() {
        let request = AccessRequest::new(
            "A B".into(),
            "a@b.com".into(),
            "9999999999".into(),
            "Member".into(),
        );
        let document = mongodb::bson::to_document(&request).unwrap();
        assert_eq!(document.get_str("status").unwrap(), "pending");
        assert!(!document.contains_key("account_id"));

        let parsed: AccessRequest = mongodb::bson::from_document(document).unwrap();
        assert_eq!(parsed, request);
    }
}
