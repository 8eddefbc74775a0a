//! In-memory [`BlobStore`] implementation for tests.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. Supports
//! write-failure injection so tests can exercise the persist-failure paths
//! without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::storage::BlobStore;

/// In-memory blob store. Cheap to construct, safe to share behind an `Arc`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_puts: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, every subsequent `put` reports failure without storing
    /// anything.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(key).cloned()
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> bool {
        if self.fail_puts.load(Ordering::SeqCst) {
            return false;
        }
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        true
    }
}
