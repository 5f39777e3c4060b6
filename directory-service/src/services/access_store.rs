use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::database::MongoDb;
use super::store::{parse_document, StoreError};
use crate::models::{AccessRequest, AccessStatus, StatusTransition};

/// Persistence for access requests. Status writes are compare-and-set on
/// the expected prior status; callers learn whether the write applied.
#[async_trait]
pub trait AccessRequestStore: Send + Sync {
    async fn insert(&self, request: &AccessRequest) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<AccessRequest>, StoreError>;

    /// Newest first, optionally restricted to one status.
    async fn list(&self, status: Option<AccessStatus>) -> Result<Vec<AccessRequest>, StoreError>;

    /// Newest first. `email` is matched case-insensitively.
    async fn list_by_email(&self, email: &str) -> Result<Vec<AccessRequest>, StoreError>;

    async fn find_by_account(&self, account_id: &str)
        -> Result<Option<AccessRequest>, StoreError>;

    /// Mark a pending, unclaimed request as under review by `claim`.
    async fn claim(&self, id: &str, claim: &str) -> Result<bool, StoreError>;

    /// Drop `claim` from a request that is still pending.
    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StoreError>;

    async fn transition(&self, id: &str, transition: &StatusTransition)
        -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub struct MongoAccessRequestStore {
    db: MongoDb,
}

impl MongoAccessRequestStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    async fn find_many(
        &self,
        filter: Document,
    ) -> Result<Vec<AccessRequest>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let mut cursor = self.db.access_requests().find(filter, options).await?;

        let mut requests = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            requests.push(parse_document(document)?);
        }
        Ok(requests)
    }
}

fn timestamp(at: chrono::DateTime<Utc>) -> Bson {
    Bson::String(at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
}

#[async_trait]
impl AccessRequestStore for MongoAccessRequestStore {
    async fn insert(&self, request: &AccessRequest) -> Result<(), StoreError> {
        let document = mongodb::bson::to_document(request)?;
        self.db.access_requests().insert_one(document, None).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AccessRequest>, StoreError> {
        self.db
            .access_requests()
            .find_one(doc! { "_id": id }, None)
            .await?
            .map(parse_document)
            .transpose()
    }

    async fn list(&self, status: Option<AccessStatus>) -> Result<Vec<AccessRequest>, StoreError> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        self.find_many(filter).await
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<AccessRequest>, StoreError> {
        self.find_many(doc! { "email": email.trim().to_lowercase() })
            .await
    }

    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        self.db
            .access_requests()
            .find_one(doc! { "account_id": account_id }, None)
            .await?
            .map(parse_document)
            .transpose()
    }

    async fn claim(&self, id: &str, claim: &str) -> Result<bool, StoreError> {
        let result = self
            .db
            .access_requests()
            .update_one(
                doc! {
                    "_id": id,
                    "status": AccessStatus::Pending.as_str(),
                    "review_claim": { "$exists": false },
                },
                doc! { "$set": { "review_claim": claim, "updated_at": timestamp(Utc::now()) } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StoreError> {
        self.db
            .access_requests()
            .update_one(
                doc! {
                    "_id": id,
                    "status": AccessStatus::Pending.as_str(),
                    "review_claim": claim,
                },
                doc! { "$unset": { "review_claim": "" } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn transition(
        &self,
        id: &str,
        transition: &StatusTransition,
    ) -> Result<bool, StoreError> {
        let mut set = doc! {
            "status": transition.to().as_str(),
            "updated_at": timestamp(transition.at()),
        };
        if let Some(account_id) = transition.account_id() {
            set.insert("account_id", account_id);
        }
        if transition.to() == AccessStatus::Verified {
            set.insert("verified_at", timestamp(transition.at()));
        }

        let result = self
            .db
            .access_requests()
            .update_one(
                doc! { "_id": id, "status": transition.from().as_str() },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .health_check()
            .await
            .map_err(|e| StoreError::backend(e.to_string()))
    }
}

/// In-process store used by tests and local runs without MongoDB.
#[derive(Default)]
pub struct InMemoryAccessRequestStore {
    requests: Mutex<HashMap<String, AccessRequest>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_transitions: AtomicBool,
}

impl InMemoryAccessRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make status transitions fail while claims and inserts still succeed.
    pub fn fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, AccessRequest>>, StoreError> {
        self.requests
            .lock()
            .map_err(|e| StoreError::backend(format!("Access request store mutex poisoned: {}", e)))
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                code: Some(503),
                message: "access request store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend("access request store rejected the write"));
        }
        Ok(())
    }

    fn newest_first(&self, keep: impl Fn(&AccessRequest) -> bool) -> Result<Vec<AccessRequest>, StoreError> {
        self.check_read()?;
        let mut requests: Vec<AccessRequest> =
            self.lock()?.values().filter(|r| keep(r)).cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}

#[async_trait]
impl AccessRequestStore for InMemoryAccessRequestStore {
    async fn insert(&self, request: &AccessRequest) -> Result<(), StoreError> {
        self.check_write()?;
        let mut requests = self.lock()?;
        if requests.contains_key(&request.id) {
            return Err(StoreError::backend(format!(
                "duplicate access request id {}",
                request.id
            )));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AccessRequest>, StoreError> {
        self.check_read()?;
        Ok(self.lock()?.get(id).cloned())
    }

    async fn list(&self, status: Option<AccessStatus>) -> Result<Vec<AccessRequest>, StoreError> {
        self.newest_first(|r| status.map_or(true, |s| r.status == s))
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<AccessRequest>, StoreError> {
        let email = email.trim().to_lowercase();
        self.newest_first(|r| r.email.to_lowercase() == email)
    }

    async fn find_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        self.check_read()?;
        Ok(self
            .lock()?
            .values()
            .find(|r| r.account_id.as_deref() == Some(account_id))
            .cloned())
    }

    async fn claim(&self, id: &str, claim: &str) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut requests = self.lock()?;
        match requests.get_mut(id) {
            Some(r) if r.status == AccessStatus::Pending && r.review_claim.is_none() => {
                r.review_claim = Some(claim.to_string());
                r.updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StoreError> {
        self.check_write()?;
        if let Some(r) = self.lock()?.get_mut(id) {
            if r.status == AccessStatus::Pending && r.review_claim.as_deref() == Some(claim) {
                r.review_claim = None;
            }
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: &str,
        transition: &StatusTransition,
    ) -> Result<bool, StoreError> {
        self.check_write()?;
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(StoreError::backend("access request status update rejected"));
        }
        let mut requests = self.lock()?;
        match requests.get_mut(id) {
            Some(r) if r.status == transition.from() => {
                transition.apply(r);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_read()
    }
}
