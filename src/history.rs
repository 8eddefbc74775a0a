//! Per-user diagnosis history over the blob backend.
//!
//! Each user owns exactly one JSON document holding their full history,
//! newest entry first, stored under a key derived from the username. The
//! backend offers no compare-and-swap, so every mutation here is a **full
//! document replace**: read the whole document, change it in memory, write
//! the whole document back.
//!
//! # Concurrency hazard (known, accepted)
//!
//! The read-then-put pair is not atomic. Two concurrent mutations for the
//! same user can both read the same prior state and both persist, and the
//! second write silently clobbers the first (last-writer-wins, lost update).
//! This matches the replicated deployment's behavior and is demonstrated in
//! `tests/integration.rs` rather than hidden. A future implementation can
//! add optimistic concurrency by stamping documents with a version token and
//! rejecting stale writes; the public contract shape leaves room for that
//! without changes.
//!
//! Concurrent requests for *different* users never interact — the derived
//! keys are disjoint.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{HistoryDocument, HistoryEntry};
use crate::storage::BlobStore;

/// History store for diagnosis-session records.
pub struct HistoryStore {
    blobs: Arc<dyn BlobStore>,
}

impl HistoryStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Blob key holding `username`'s history document.
    ///
    /// Deterministic, one document per user, never shared across users, and
    /// not derivable without the username itself.
    pub fn document_key(username: &str) -> String {
        format!("{}-history.json", username)
    }

    /// Append a new entry to the front of `username`'s history and return
    /// the updated document.
    ///
    /// The entry gets a fresh unique id and the current timestamp. A missing
    /// document means this is the user's first session; an empty history is
    /// created for them on the spot.
    ///
    /// # Errors
    ///
    /// `Persist` if the blob write fails — the entry is lost, no retry.
    pub async fn append(
        &self,
        username: &str,
        issue_id: i64,
        functionality: Option<bool>,
    ) -> Result<HistoryDocument> {
        let key = Self::document_key(username);

        let mut doc = match self.blobs.get(&key).await {
            Some(bytes) => decode_document(&key, &bytes)?,
            None => Vec::new(),
        };

        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            issue_id,
            username: username.to_string(),
            created_at: Utc::now(),
            functionality,
        };
        doc.insert(0, entry);

        self.replace_document(&key, &doc).await?;
        Ok(doc)
    }

    /// Fetch `username`'s full history, newest first.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if no document exists for this user.
    pub async fn list(&self, username: &str) -> Result<HistoryDocument> {
        let key = Self::document_key(username);
        match self.blobs.get(&key).await {
            Some(bytes) => decode_document(&key, &bytes),
            None => Err(Error::UserNotFound {
                username: username.to_string(),
            }),
        }
    }

    /// Set the `functionality` flag on the entry with id `entry_id` and
    /// persist the whole document back.
    ///
    /// Overwrites any previously set value, so applying the same update
    /// twice is idempotent.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user has no history, `EntryNotFound` if no
    /// entry matches `entry_id` (the stored document is left unchanged),
    /// `Persist` if the write fails.
    pub async fn set_functionality(
        &self,
        username: &str,
        entry_id: &str,
        value: bool,
    ) -> Result<HistoryDocument> {
        let key = Self::document_key(username);

        let mut doc = match self.blobs.get(&key).await {
            Some(bytes) => decode_document(&key, &bytes)?,
            None => {
                return Err(Error::UserNotFound {
                    username: username.to_string(),
                })
            }
        };

        let entry = doc
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| Error::EntryNotFound {
                entry_id: entry_id.to_string(),
            })?;
        entry.functionality = Some(value);

        self.replace_document(&key, &doc).await?;
        Ok(doc)
    }

    /// Write a full document under `key`, replacing whatever was there.
    ///
    /// This is the only write path; there is no field-level patching.
    async fn replace_document(&self, key: &str, doc: &HistoryDocument) -> Result<()> {
        let bytes = serde_json::to_vec(doc).map_err(|e| Error::Decode {
            key: key.to_string(),
            source: e,
        })?;
        if self.blobs.put(key, &bytes).await {
            Ok(())
        } else {
            Err(Error::Persist {
                key: key.to_string(),
            })
        }
    }
}

fn decode_document(key: &str, bytes: &[u8]) -> Result<HistoryDocument> {
    serde_json::from_slice(bytes).map_err(|e| Error::Decode {
        key: key.to_string(),
        source: e,
    })
}
