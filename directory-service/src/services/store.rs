//! Shared pieces of the document-store repositories.

use mongodb::bson::{self, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Server-side document validation failure.
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the document's shape.
    #[error("Invalid document structure: {0}")]
    Schema(String),

    /// A stored document could not be parsed into its typed record.
    #[error("Malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Document store error: {message}")]
    Backend { code: Option<u16>, message: String },
}

impl StoreError {
    /// HTTP-like status reported by the store, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::Schema(_) => Some(400),
            StoreError::Malformed { .. } => None,
            StoreError::Backend { code, .. } => *code,
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            code: None,
            message: message.into(),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DOCUMENT_VALIDATION_FAILURE {
                return StoreError::Schema(write_error.message.clone());
            }
        }
        StoreError::backend(err.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Schema(err.to_string())
    }
}

/// Parse a raw document at the store boundary, rejecting anything that does
/// not fit the typed record.
pub fn parse_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    let id = document
        .get("_id")
        .map(|value| match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        })
        .unwrap_or_else(|| "<missing _id>".to_string());

    bson::from_document(document).map_err(|e| {
        tracing::error!(document_id = %id, error = %e, "Rejecting malformed document");
        StoreError::Malformed {
            id,
            reason: e.to_string(),
        }
    })
}

/// Escape regex metacharacters so user input matches literally.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessRequest;
    use mongodb::bson::doc;

    #[test]
    fn escape_regex_neutralises_metacharacters() {
        assert_eq!(escape_regex("st. mary's (1)"), r"st\. mary's \(1\)");
        assert_eq!(escape_regex("a+b*c"), r"a\+b\*c");
    }

    #[test]
    fn parse_document_rejects_missing_fields() {
        let err = parse_document::<AccessRequest>(doc! { "_id": "r1", "name": "A" }).unwrap_err();
        match err {
            StoreError::Malformed { id, .. } => assert_eq!(id, "r1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_document_rejects_unknown_status() {
        let err = parse_document::<AccessRequest>(doc! {
            "_id": "r2",
            "name": "A",
            "email": "a@b.com",
            "phone": "9999999999",
            "designation": "Member",
            "status": "archived",
            "created_at": "2024-01-01T00:00:00Z",
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
