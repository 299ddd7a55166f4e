//! Local blob store abstraction
//!
//! The cached content of every synced file lives in a flat namespace owned
//! by an implementation of [`BlobStore`]. The sync core addresses blobs by
//! name only; it derives those names from its own `<remoteId>_<name>` /
//! `_<name>` convention and treats the store as dumb byte storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

use crate::error::Result;

/// Flat named byte storage for cached file content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob, replacing any existing content under `name`.
    async fn write(&self, name: &str, data: Bytes) -> Result<()>;

    /// Read a blob's full content.
    async fn read(&self, name: &str) -> Result<Bytes>;

    /// Rename a blob. Renaming a missing blob is a no-op, not an error:
    /// the reconciler re-runs its bookkeeping after a crash and the rename
    /// may already have happened.
    async fn rename(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Delete a blob. Deleting a missing blob is a no-op.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Whether a blob exists under `name`.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Absolute filesystem path for `name`, for collaborators that hand
    /// paths to upload APIs. Implementations without real paths return
    /// `BridgeError::NotAvailable`.
    fn path_of(&self, name: &str) -> Result<PathBuf>;
}
