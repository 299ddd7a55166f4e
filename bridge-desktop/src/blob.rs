//! Directory-backed blob store using Tokio

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::BlobStore;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Flat directory of content blobs, one file per blob name.
///
/// Blob names map directly to file names inside the root directory, so the
/// `<remoteId>_<name>` / `_<name>` naming convention is visible on disk.
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Blob store rooted at the platform data directory.
    pub fn new() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("text-drive-sync")
            .join("blobs");
        Self { root }
    }

    /// Blob store rooted at a custom directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    async fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await.map_err(BridgeError::Io)?;
            debug!(path = ?self.root, "Created blob directory");
        }
        Ok(())
    }

    /// Blob names must stay inside the flat namespace.
    fn checked_name(name: &str) -> Result<&str> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(BridgeError::OperationFailed(format!(
                "invalid blob name '{}'",
                name
            )));
        }
        Ok(name)
    }
}

impl Default for DirBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn write(&self, name: &str, data: Bytes) -> Result<()> {
        self.ensure_root().await?;
        let path = self.path_of(name)?;
        fs::write(&path, data.as_ref())
            .await
            .map_err(BridgeError::Io)?;
        debug!(blob = name, size = data.len(), "Wrote blob");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Bytes> {
        let path = self.path_of(name)?;
        let data = fs::read(&path).await.map_err(BridgeError::Io)?;
        debug!(blob = name, size = data.len(), "Read blob");
        Ok(Bytes::from(data))
    }

    async fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.path_of(old_name)?;
        let new_path = self.path_of(new_name)?;
        match fs::rename(&old_path, &new_path).await {
            Ok(()) => {
                debug!(from = old_name, to = new_name, "Renamed blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(from = old_name, "Rename of missing blob skipped");
                Ok(())
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(blob = name, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        Ok(fs::try_exists(&path).await.map_err(BridgeError::Io)?)
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(Self::checked_name(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DirBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirBlobStore::with_root(dir.path().to_path_buf());
        (dir, store)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_dir, store) = store();

        store
            .write("_notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let data = store.read("_notes.txt").await.unwrap();
        assert_eq!(&data[..], b"hello");
        assert!(store.exists("_notes.txt").await.unwrap());
    }

    #[tokio::test]
    async fn rename_moves_content() {
        let (_dir, store) = store();
        store
            .write("_notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        store.rename("_notes.txt", "R1_notes.txt").await.unwrap();

        assert!(!store.exists("_notes.txt").await.unwrap());
        let data = store.read("R1_notes.txt").await.unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn rename_of_missing_blob_is_noop() {
        let (_dir, store) = store();
        store.rename("_ghost.txt", "R1_ghost.txt").await.unwrap();
        assert!(!store.exists("R1_ghost.txt").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store();
        store
            .write("_notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        store.delete("_notes.txt").await.unwrap();
        store.delete("_notes.txt").await.unwrap();
        assert!(!store.exists("_notes.txt").await.unwrap());
    }

    #[tokio::test]
    async fn path_traversal_names_are_rejected() {
        let (_dir, store) = store();
        assert!(store.path_of("../escape.txt").is_err());
        assert!(store.path_of("").is_err());
        assert!(store.path_of("_notes.txt").is_ok());
    }
}
