//! Core data models for diagnosis history and the symptom catalog.
//!
//! JSON field names are camelCase to stay wire-compatible with documents
//! already persisted by earlier deployments, including the snapshot's
//! `lastUpdate` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single diagnosis-session record within a user's history.
///
/// `id` is generated at creation time and never changes. `functionality`
/// records whether the suggested diagnosis worked for the user; it starts
/// unset and is overwritten by later confirmations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub issue_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub functionality: Option<bool>,
}

/// The full per-user history, newest entry first.
///
/// Persisted as one JSON array per user. All entries share the owning
/// username and carry unique `id`s.
pub type HistoryDocument = Vec<HistoryEntry>;

/// A timestamped copy of the full symptom catalog.
///
/// Replaced wholesale on refresh, never merged. The catalog records are kept
/// opaque — their schema belongs to the external knowledge service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// When the catalog was fetched from the knowledge service.
    #[serde(rename = "lastUpdate")]
    pub fetched_at: DateTime<Utc>,
    pub symptoms: Vec<serde_json::Value>,
}

/// Biological gender as expected by the knowledge service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{}': expected male or female", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_json_field_names() {
        let entry = HistoryEntry {
            id: "abc".to_string(),
            issue_id: 7,
            username: "a@x.com".to_string(),
            created_at: Utc::now(),
            functionality: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("issueId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json["functionality"].is_null());
    }

    #[test]
    fn test_snapshot_uses_last_update_field() {
        let snap = CatalogSnapshot {
            fetched_at: Utc::now(),
            symptoms: vec![serde_json::json!({"ID": 1, "Name": "Headache"})],
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("lastUpdate").is_some());
        assert_eq!(json["symptoms"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_gender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
        assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }
}
