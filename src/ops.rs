//! Per-request operations tying identity, history, and knowledge together.
//!
//! Each function corresponds to one user-facing operation. The caller (CLI,
//! HTTP frontend, whatever) has already extracted a [`UserIdentity`]; these
//! functions never look past its fields.

use serde_json::Value;
use tracing::info;

use crate::catalog::CatalogCache;
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::identity::UserIdentity;
use crate::knowledge::{KnowledgeClient, SymptomSource};
use crate::models::HistoryDocument;

/// Record a new diagnosis session in the caller's history.
pub async fn add_history_entry(
    store: &HistoryStore,
    identity: &UserIdentity,
    issue_id: i64,
    functionality: Option<bool>,
) -> Result<HistoryDocument> {
    let doc = store
        .append(&identity.email, issue_id, functionality)
        .await?;
    info!(user = %identity.email, issue_id, entries = doc.len(), "history entry added");
    Ok(doc)
}

/// The caller's full diagnosis history, newest first.
pub async fn get_history(
    store: &HistoryStore,
    identity: &UserIdentity,
) -> Result<HistoryDocument> {
    store.list(&identity.email).await
}

/// Confirm (or deny) that a past diagnosis worked.
pub async fn confirm_history_entry(
    store: &HistoryStore,
    identity: &UserIdentity,
    entry_id: &str,
    functionality: bool,
) -> Result<HistoryDocument> {
    store
        .set_functionality(&identity.email, entry_id, functionality)
        .await
}

/// The symptom catalog, served from the cache when fresh.
pub async fn get_symptoms(
    cache: &CatalogCache,
    client: &mut KnowledgeClient,
) -> Result<Vec<Value>> {
    cache.symptoms(client).await
}

/// Diagnosis proposals for the given symptoms, using the caller's age and
/// gender from the identity record.
pub async fn get_diagnosis(
    client: &mut KnowledgeClient,
    identity: &UserIdentity,
    symptom_ids: &[i64],
) -> Result<Value> {
    if symptom_ids.is_empty() {
        return Err(Error::Validation(
            "at least one symptom id is required".to_string(),
        ));
    }
    client.ensure_session().await?;
    client
        .fetch_diagnosis(symptom_ids, identity.age_years(), identity.gender)
        .await
}

/// Detail for a single issue from the knowledge service.
pub async fn get_issue(client: &mut KnowledgeClient, issue_id: i64) -> Result<Value> {
    client.ensure_session().await?;
    client.fetch_issue(issue_id).await
}
