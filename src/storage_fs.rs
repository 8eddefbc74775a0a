//! Filesystem [`BlobStore`] implementation.
//!
//! Maps each key to a file under a configured root directory. Intended for
//! local development and offline use of the `triage` CLI; deployments use
//! the S3 backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::storage::BlobStore;

/// Blob store backed by a local directory, one file per key.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are flat names like "a@x.com-history.json"; path separators
        // are not part of the key space.
        self.root.join(key.replace(['/', '\\'], "_"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "blob read failed");
                None
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> bool {
        let path = self.path_for(key);
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            warn!(key, error = %e, "could not create blob root directory");
            return false;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "blob write failed");
                false
            }
        }
    }
}
