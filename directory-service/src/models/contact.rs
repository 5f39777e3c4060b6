use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Directory record for a contact person attached to a forane and parish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPerson {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub forane: String,
    #[serde(default)]
    pub forane_name: String,
    pub parish: String,
    #[serde(default)]
    pub parish_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactPerson {
    /// Case-insensitive substring match of an already lower-cased needle
    /// against the fields covered by `scope`.
    pub fn matches(&self, needle: &str, scope: SearchScope) -> bool {
        let hit = |value: &str| value.to_lowercase().contains(needle);
        let forane = || hit(&self.forane) || hit(&self.forane_name);
        let parish = || hit(&self.parish) || hit(&self.parish_name);

        match scope {
            SearchScope::Forane => forane(),
            SearchScope::Parish => parish(),
            SearchScope::Both => forane() || parish(),
        }
    }
}

/// Equality filter for listing contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub forane: Option<String>,
    pub parish: Option<String>,
}

impl ContactFilter {
    pub fn accepts(&self, contact: &ContactPerson) -> bool {
        self.forane.as_deref().map_or(true, |f| contact.forane == f)
            && self.parish.as_deref().map_or(true, |p| contact.parish == p)
    }
}

/// Which directory fields a search query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Forane,
    Parish,
    #[default]
    Both,
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forane" => Ok(SearchScope::Forane),
            "parish" => Ok(SearchScope::Parish),
            "" | "both" | "all" => Ok(SearchScope::Both),
            _ => Err(format!("Invalid search type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactPerson {
        let now = Utc::now();
        ContactPerson {
            id: "c1".into(),
            name: "Joseph".into(),
            phone: "9999999999".into(),
            forane: "2".into(),
            forane_name: "Cherpunkal".into(),
            parish: "2-1".into(),
            parish_name: "Cherpunkal".into(),
            dob: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matches_respects_scope() {
        let mut c = contact();
        c.parish_name = "Kidangoor".into();

        assert!(c.matches("cherp", SearchScope::Forane));
        assert!(!c.matches("cherp", SearchScope::Parish));
        assert!(c.matches("kidan", SearchScope::Parish));
        assert!(c.matches("kidan", SearchScope::Both));
    }

    #[test]
    fn filter_requires_every_given_field() {
        let c = contact();
        assert!(ContactFilter::default().accepts(&c));
        assert!(ContactFilter {
            forane: Some("2".into()),
            parish: None
        }
        .accepts(&c));
        assert!(!ContactFilter {
            forane: Some("2".into()),
            parish: Some("2-9".into())
        }
        .accepts(&c));
    }

    #[test]
    fn scope_parses_known_values() {
        assert_eq!("FORANE".parse::<SearchScope>(), Ok(SearchScope::Forane));
        assert_eq!("".parse::<SearchScope>(), Ok(SearchScope::Both));
        assert!("name".parse::<SearchScope>().is_err());
    }
}
