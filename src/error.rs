//! Error taxonomy for the diagnosis-assistant core.
//!
//! Callers get a typed [`Error`] they can match on instead of an opaque
//! failure: missing resources (`UserNotFound`, `EntryNotFound`) and malformed
//! input (`Validation`) are recoverable and must stay distinguishable from
//! infrastructure faults (`Upstream`, `Persist`, `Decode`).
//!
//! Blob-backend *read* failures never appear here — the [`BlobStore`]
//! boundary reports them as an absent value, so storage implementations can
//! apply their own failure policy without leaking transport errors upward.
//!
//! [`BlobStore`]: crate::storage::BlobStore

use thiserror::Error;

/// All failures surfaced by the history store, catalog cache, and knowledge
/// service adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// No history document exists for this user.
    #[error("no diagnosis history found for {username}")]
    UserNotFound { username: String },

    /// The user's history document exists but holds no entry with this id.
    #[error("no history entry with id {entry_id}")]
    EntryNotFound { entry_id: String },

    /// Malformed caller input (bad identity token, empty symptom list, ...).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The external knowledge service failed or was unreachable.
    ///
    /// `call` names the outbound request; `message` carries a truncated
    /// remote diagnostic so operators can see what the service said without
    /// the full response body being echoed to end users.
    #[error("knowledge service call '{call}' failed: {message}")]
    Upstream { call: &'static str, message: String },

    /// The blob backend rejected a write. The mutation is lost; there is
    /// no retry.
    #[error("could not persist blob '{key}'")]
    Persist { key: String },

    /// A stored document could not be deserialized.
    #[error("stored blob '{key}' is not valid JSON")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A knowledge service request was attempted before a session token was
    /// established via `authenticate()`.
    #[error("knowledge service called before authentication")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, Error>;
