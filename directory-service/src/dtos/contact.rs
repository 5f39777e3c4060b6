use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::ContactPerson;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContactListQuery {
    pub forane: Option<String>,
    pub parish: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContactSearchQuery {
    /// Search text; fewer than two characters returns nothing.
    pub q: Option<String>,
    /// `forane` or `parish`; anything else searches both.
    #[serde(rename = "type")]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 10, message = "Enter a valid contact number"))]
    pub contact_number: String,
    #[validate(length(min = 1, message = "Please select a forane"))]
    pub forane: String,
    #[validate(length(min = 1, message = "Please select a parish"))]
    pub parish: String,
    /// Date of birth as `YYYY-MM-DD`.
    pub dob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub forane: String,
    pub forane_name: String,
    pub parish: String,
    pub parish_name: String,
    pub dob: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContactPerson> for ContactView {
    fn from(contact: ContactPerson) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            phone: contact.phone,
            forane: contact.forane,
            forane_name: contact.forane_name,
            parish: contact.parish,
            parish_name: contact.parish_name,
            dob: contact.dob,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactListResponse {
    pub documents: Vec<ContactView>,
    pub total: usize,
}

impl From<Vec<ContactPerson>> for ContactListResponse {
    fn from(contacts: Vec<ContactPerson>) -> Self {
        let documents: Vec<ContactView> = contacts.into_iter().map(ContactView::from).collect();
        Self {
            total: documents.len(),
            documents,
        }
    }
}
