//! Static forane and parish hierarchy.

use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Forane, Parish};

const EMBEDDED_DIOCESE: &str = include_str!("../../data/diocese.json");

#[derive(Debug, Error)]
pub enum DioceseError {
    #[error("Failed to read diocese data from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid diocese data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },
}

/// Read-only lookup over the diocese hierarchy. Forane and parish order
/// follows the source table.
#[derive(Debug, Clone)]
pub struct Diocese {
    foranes: Vec<Forane>,
}

impl Diocese {
    /// Load the table from `path`, or the embedded copy when none is given.
    pub fn load(path: Option<&str>) -> Result<Self, DioceseError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| DioceseError::Read {
                    path: path.to_string(),
                    source,
                })?;
                tracing::info!(path = %path, "Loading diocese data from file");
                Self::from_json(&raw)
            }
            None => Self::embedded(),
        }
    }

    pub fn embedded() -> Result<Self, DioceseError> {
        Self::from_json(EMBEDDED_DIOCESE)
    }

    pub fn from_json(raw: &str) -> Result<Self, DioceseError> {
        let foranes: Vec<Forane> = serde_json::from_str(raw)?;
        Self::new(foranes)
    }

    pub fn new(foranes: Vec<Forane>) -> Result<Self, DioceseError> {
        let mut forane_ids = HashSet::new();
        for forane in &foranes {
            if !forane_ids.insert(forane.id.as_str()) {
                return Err(DioceseError::Duplicate {
                    kind: "forane",
                    id: forane.id.clone(),
                });
            }

            let mut parish_ids = HashSet::new();
            for parish in &forane.parishes {
                if !parish_ids.insert(parish.id.as_str()) {
                    return Err(DioceseError::Duplicate {
                        kind: "parish",
                        id: parish.id.clone(),
                    });
                }
            }
        }

        Ok(Self { foranes })
    }

    pub fn foranes(&self) -> &[Forane] {
        &self.foranes
    }

    /// Case-insensitive substring filter on name and full name. A blank
    /// query returns every forane.
    pub fn search(&self, query: &str) -> Vec<&Forane> {
        let needle = query.trim().to_lowercase();
        self.foranes
            .iter()
            .filter(|f| {
                needle.is_empty()
                    || f.name.to_lowercase().contains(&needle)
                    || f.full_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn forane(&self, id: &str) -> Option<&Forane> {
        self.foranes.iter().find(|f| f.id == id)
    }

    pub fn parish(&self, forane_id: &str, parish_id: &str) -> Option<&Parish> {
        self.forane(forane_id).and_then(|f| f.parish(parish_id))
    }
}
