//! Time-boxed cache of the full symptom catalog.
//!
//! The catalog is large and changes rarely, so a snapshot is persisted
//! through the blob backend under one well-known key and served from there
//! while fresh. Freshness is *absolute elapsed time* since the fetch, not
//! calendar-day identity: a snapshot taken at 23:59 is still fresh at 22:00
//! the next day, and stale 25 hours after it was taken regardless of the
//! wall clock.
//!
//! A stale or absent snapshot triggers a full refresh through the knowledge
//! service — snapshots are replaced wholesale, never merged, and there is no
//! fallback to stale data when the upstream fetch fails.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::knowledge::SymptomSource;
use crate::models::CatalogSnapshot;
use crate::storage::BlobStore;

/// Blob key the catalog snapshot lives under.
pub const CATALOG_KEY: &str = "symptoms.json";

/// Default snapshot lifetime: one day of elapsed time, inclusive.
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Cache for the symptom catalog, persisted through the blob backend.
pub struct CatalogCache {
    blobs: Arc<dyn BlobStore>,
    max_age: Duration,
}

impl CatalogCache {
    /// Cache with the default one-day lifetime.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_max_age(blobs, Duration::hours(DEFAULT_MAX_AGE_HOURS))
    }

    pub fn with_max_age(blobs: Arc<dyn BlobStore>, max_age: Duration) -> Self {
        Self { blobs, max_age }
    }

    /// Return the symptom catalog, from the cached snapshot when it is
    /// fresh, otherwise freshly fetched through `source`.
    ///
    /// After a refresh the new snapshot is persisted best-effort: a rejected
    /// write is logged and ignored because the freshly fetched symptoms are
    /// still good to serve. Only when the cache cannot help *and* the
    /// upstream fetch fails does the whole operation fail.
    pub async fn symptoms(&self, source: &mut dyn SymptomSource) -> Result<Vec<Value>> {
        if let Some(snapshot) = self.read_snapshot().await {
            let age = Utc::now().signed_duration_since(snapshot.fetched_at);
            if age.abs() <= self.max_age {
                debug!(age_secs = age.num_seconds(), "serving symptoms from snapshot");
                return Ok(snapshot.symptoms);
            }
            debug!(age_secs = age.num_seconds(), "snapshot is stale, refreshing");
        }

        source.ensure_session().await?;
        let symptoms = source.fetch_symptoms().await?;

        let snapshot = CatalogSnapshot {
            fetched_at: Utc::now(),
            symptoms,
        };
        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => {
                if !self.blobs.put(CATALOG_KEY, &bytes).await {
                    warn!(
                        key = CATALOG_KEY,
                        "snapshot write rejected; serving fetched symptoms without caching"
                    );
                }
            }
            Err(e) => {
                // Best-effort persist: a snapshot we cannot encode is
                // treated the same as a rejected write.
                warn!(key = CATALOG_KEY, error = %e, "snapshot could not be encoded");
            }
        }

        Ok(snapshot.symptoms)
    }

    async fn read_snapshot(&self) -> Option<CatalogSnapshot> {
        let bytes = self.blobs.get(CATALOG_KEY).await?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                // An unreadable snapshot is treated as stale and refreshed.
                warn!(key = CATALOG_KEY, error = %e, "stored snapshot is unreadable");
                None
            }
        }
    }
}
