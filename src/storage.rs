//! Blob storage abstraction shared by the history store and catalog cache.
//!
//! The [`BlobStore`] trait models a key-addressed byte store with no
//! compare-and-swap, no versioning, and no locking. Each `put` is atomic on
//! its own, but a read followed by a put is not — callers that do
//! read-modify-write (the history store does, on every mutation) are exposed
//! to last-writer-wins races and must document that themselves.
//!
//! Failure policy at this boundary: implementations never propagate transport
//! or I/O errors. A failed read is reported as an absent value and a failed
//! write as `false`, with the underlying cause logged inside the
//! implementation. Callers decide what a missing blob or rejected write means
//! for them.

use async_trait::async_trait;

/// Abstract key→byte-blob backend.
///
/// Implementations must be `Send + Sync`; they are shared across concurrent
/// request handlers behind an `Arc`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if it is absent or the
    /// backend could not be reached.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous value.
    ///
    /// Returns `true` on success. A `false` return means the write was lost;
    /// there is no partial state to clean up.
    async fn put(&self, key: &str, bytes: &[u8]) -> bool;
}
