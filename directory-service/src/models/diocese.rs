use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Parish {
    #[schema(example = "1-1")]
    pub id: String,
    #[schema(example = "Pala Cathedral")]
    pub name: String,
}

/// Administrative grouping of parishes. Parish order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Forane {
    #[schema(example = "1")]
    pub id: String,
    #[schema(example = "Pala Cathedral")]
    pub name: String,
    #[schema(example = "ST. THOMAS CATHEDRAL PALAI CATHEDRAL")]
    pub full_name: String,
    pub parishes: Vec<Parish>,
}

impl Forane {
    pub fn total_parishes(&self) -> usize {
        self.parishes.len()
    }

    pub fn parish(&self, parish_id: &str) -> Option<&Parish> {
        self.parishes.iter().find(|p| p.id == parish_id)
    }
}
