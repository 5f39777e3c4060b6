use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Forane, Parish};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ForaneQuery {
    /// Case-insensitive filter on the forane name.
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForaneSummary {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub total_parishes: usize,
}

impl From<&Forane> for ForaneSummary {
    fn from(forane: &Forane) -> Self {
        Self {
            id: forane.id.clone(),
            name: forane.name.clone(),
            full_name: forane.full_name.clone(),
            total_parishes: forane.total_parishes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForaneListResponse {
    pub foranes: Vec<ForaneSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForaneDetail {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub total_parishes: usize,
    pub parishes: Vec<Parish>,
}

impl From<&Forane> for ForaneDetail {
    fn from(forane: &Forane) -> Self {
        Self {
            id: forane.id.clone(),
            name: forane.name.clone(),
            full_name: forane.full_name.clone(),
            total_parishes: forane.total_parishes(),
            parishes: forane.parishes.clone(),
        }
    }
}
