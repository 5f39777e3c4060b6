use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use super::database::MongoDb;
use super::store::{escape_regex, parse_document, StoreError};
use crate::models::{ContactFilter, ContactPerson, SearchScope};

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert(&self, contact: &ContactPerson) -> Result<(), StoreError>;

    /// Store-native order; no sort is applied.
    async fn list(&self, filter: &ContactFilter) -> Result<Vec<ContactPerson>, StoreError>;

    /// Case-insensitive substring search over the fields `scope` names,
    /// returning at most `limit` records.
    async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        limit: usize,
    ) -> Result<Vec<ContactPerson>, StoreError>;
}

pub struct MongoContactStore {
    db: MongoDb,
}

impl MongoContactStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    async fn collect(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<ContactPerson>, StoreError> {
        let mut cursor = self.db.contact_persons().find(filter, options).await?;
        let mut contacts = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            contacts.push(parse_document(document)?);
        }
        Ok(contacts)
    }
}

fn search_filter(query: &str, scope: SearchScope) -> Document {
    let pattern = doc! { "$regex": escape_regex(query), "$options": "i" };
    let fields: &[&str] = match scope {
        SearchScope::Forane => &["forane", "forane_name"],
        SearchScope::Parish => &["parish", "parish_name"],
        SearchScope::Both => &["forane", "forane_name", "parish", "parish_name"],
    };

    let clauses: Vec<Bson> = fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, pattern.clone());
            Bson::Document(clause)
        })
        .collect();
    doc! { "$or": clauses }
}

#[async_trait]
impl ContactStore for MongoContactStore {
    async fn insert(&self, contact: &ContactPerson) -> Result<(), StoreError> {
        let document = mongodb::bson::to_document(contact)?;
        self.db.contact_persons().insert_one(document, None).await?;
        Ok(())
    }

    async fn list(&self, filter: &ContactFilter) -> Result<Vec<ContactPerson>, StoreError> {
        let mut query = doc! {};
        if let Some(forane) = &filter.forane {
            query.insert("forane", forane);
        }
        if let Some(parish) = &filter.parish {
            query.insert("parish", parish);
        }
        self.collect(query, None).await
    }

    async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        limit: usize,
    ) -> Result<Vec<ContactPerson>, StoreError> {
        let options = FindOptions::builder().limit(limit as i64).build();
        self.collect(search_filter(query, scope), Some(options))
            .await
    }
}

#[derive(Default)]
pub struct InMemoryContactStore {
    contacts: Mutex<Vec<ContactPerson>>,
    search_calls: AtomicU64,
    fail: AtomicBool,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `search` reached the store.
    pub fn search_calls(&self) -> u64 {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Result<Vec<ContactPerson>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::backend("contact store unavailable"));
        }
        self.contacts
            .lock()
            .map(|c| c.clone())
            .map_err(|e| StoreError::backend(format!("Contact store mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn insert(&self, contact: &ContactPerson) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::backend("contact store unavailable"));
        }
        self.contacts
            .lock()
            .map_err(|e| StoreError::backend(format!("Contact store mutex poisoned: {}", e)))?
            .push(contact.clone());
        Ok(())
    }

    async fn list(&self, filter: &ContactFilter) -> Result<Vec<ContactPerson>, StoreError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|c| filter.accepts(c))
            .collect())
    }

    async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        limit: usize,
    ) -> Result<Vec<ContactPerson>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_lowercase();
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|c| c.matches(&needle, scope))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_filter_covers_scope_fields() {
        let filter = search_filter("st.", SearchScope::Parish);
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);

        let first = clauses[0].as_document().unwrap();
        let pattern = first.get_document("parish").unwrap();
        assert_eq!(pattern.get_str("$regex").unwrap(), r"st\.");
        assert_eq!(pattern.get_str("$options").unwrap(), "i");

        let both = search_filter("x", SearchScope::Both);
        assert_eq!(both.get_array("$or").unwrap().len(), 4);
    }
}
