use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{AccessRequest, AccessStatus};

/// Public sign-up form. Emptiness and format are checked by the workflow so
/// that a missing field is reported as a plain 400.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(max = 120))]
    #[schema(example = "A B")]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 254))]
    #[schema(example = "a@b.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    #[schema(example = "9999999999")]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    #[schema(example = "Member")]
    pub designation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub status: AccessStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl From<AccessRequest> for AccessRequestView {
    fn from(request: AccessRequest) -> Self {
        Self {
            id: request.id,
            name: request.name,
            email: request.email,
            phone: request.phone,
            designation: request.designation,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
            account_id: request.account_id,
            verified_at: request.verified_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRequestResponse {
    pub success: bool,
    pub user_request: AccessRequestView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRequestListResponse {
    pub success: bool,
    pub user_requests: Vec<AccessRequestView>,
    pub total: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRequestsQuery {
    /// Only return requests in this status.
    pub status: Option<String>,
}

/// Review decision. Name and phone override the stored request when present;
/// `email`, if sent, must match the address on the request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveUserRequest {
    #[validate(length(min = 1, message = "requestId is required"))]
    pub request_id: String,
    pub approved: bool,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalData {
    /// Identity-provider account created on approval.
    pub user_id: Option<String>,
    pub status: AccessStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApproveUserResponse {
    pub success: bool,
    pub message: String,
    pub data: ApprovalData,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "secret is required"))]
    pub secret: String,
}
