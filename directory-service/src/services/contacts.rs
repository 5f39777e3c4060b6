use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::contact_store::ContactStore;
use super::directory::Diocese;
use super::error::WorkflowError;
use crate::models::{ContactFilter, ContactPerson, SearchScope};

/// Upper bound on search results.
pub const SEARCH_LIMIT: usize = 50;
/// Queries shorter than this return nothing.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub contact_number: String,
    pub forane: String,
    pub parish: String,
    pub dob: Option<String>,
}

/// Contact person records scoped by the diocese hierarchy.
#[derive(Clone)]
pub struct ContactDirectory {
    store: Arc<dyn ContactStore>,
    diocese: Arc<Diocese>,
}

impl ContactDirectory {
    pub fn new(store: Arc<dyn ContactStore>, diocese: Arc<Diocese>) -> Self {
        Self { store, diocese }
    }

    pub async fn list(&self, filter: &ContactFilter) -> Result<Vec<ContactPerson>, WorkflowError> {
        self.store
            .list(filter)
            .await
            .map_err(WorkflowError::retrieval)
    }

    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
    ) -> Result<Vec<ContactPerson>, WorkflowError> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let mut results = self
            .store
            .search(query, scope, SEARCH_LIMIT)
            .await
            .map_err(WorkflowError::retrieval)?;
        results.truncate(SEARCH_LIMIT);

        tracing::debug!(query = %query, scope = ?scope, hits = results.len(), "Contact search");
        Ok(results)
    }

    pub async fn create(&self, input: NewContact) -> Result<ContactPerson, WorkflowError> {
        let name = input.name.trim().to_string();
        if name.chars().count() < 2 {
            return Err(WorkflowError::Validation(
                "Name must be at least 2 characters".to_string(),
            ));
        }

        let phone = normalize_contact_number(&input.contact_number)?;

        let forane_id = input.forane.trim();
        let parish_id = input.parish.trim();
        let forane = self.diocese.forane(forane_id).ok_or_else(|| {
            WorkflowError::Validation(format!("Unknown forane: {}", forane_id))
        })?;
        let parish = forane.parish(parish_id).ok_or_else(|| {
            WorkflowError::Validation(format!(
                "Parish {} does not belong to forane {}",
                parish_id, forane.name
            ))
        })?;

        let dob = match input.dob.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    WorkflowError::Validation("Date of birth must be YYYY-MM-DD".to_string())
                })?;
                Some(date.format("%Y-%m-%d").to_string())
            }
            None => None,
        };

        let now = Utc::now();
        let contact = ContactPerson {
            id: Uuid::new_v4().to_string(),
            name,
            phone,
            forane: forane.id.clone(),
            forane_name: forane.name.clone(),
            parish: parish.id.clone(),
            parish_name: parish.name.clone(),
            dob,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&contact).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to store contact person");
            WorkflowError::storage(e)
        })?;

        tracing::info!(contact_id = %contact.id, forane = %contact.forane, parish = %contact.parish, "Contact person created");
        Ok(contact)
    }
}

/// Strip separators and require at least ten digits, with an optional
/// leading `+`.
fn normalize_contact_number(raw: &str) -> Result<String, WorkflowError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    if digits.len() < 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(WorkflowError::Validation(
            "Enter a valid contact number".to_string(),
        ));
    }
    Ok(compact)
}
