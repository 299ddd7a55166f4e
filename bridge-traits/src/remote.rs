//! Remote store abstraction
//!
//! Platform-agnostic contract for the cloud file service that holds the
//! canonical copy of each synced file. Implementations own all transport
//! details: authentication, pagination, retries, rate limiting. The sync
//! core only ever sees fully materialized listings and byte payloads.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// One remote file as observed in a single listing call.
///
/// Snapshots live only for the pass that fetched them; nothing persists
/// them across passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileSnapshot {
    /// Provider-assigned opaque file identifier
    pub remote_id: String,
    /// Display name, including extension
    pub display_name: String,
    /// Last modification time, Unix seconds
    pub modified_at: i64,
    /// Parent folder identifiers
    pub parent_ids: Vec<String>,
}

/// Listing parameters forwarded verbatim to the provider.
///
/// Providers translate these into their own query syntax; the defaults
/// select plain-text files with the fields the reconciler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Provider search expression
    pub query: String,
    /// Storage spaces to search
    pub spaces: String,
    /// Response fields to request
    pub fields: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            query: "mimeType='text/plain'".to_string(),
            spaces: "drive".to_string(),
            fields: "nextPageToken, files(id, name, modifiedTime, parents)".to_string(),
        }
    }
}

impl ListQuery {
    /// Listing scoped to a single parent folder, when one is configured.
    pub fn scoped_to_folder(folder_id: &str) -> Self {
        Self {
            query: format!("mimeType='text/plain' and '{}' in parents", folder_id),
            ..Self::default()
        }
    }
}

/// Cloud file store client.
///
/// All calls are at-least-once from the worker's point of view: a command is
/// only removed from the durable queue after the call returns `Ok`, so every
/// method may be re-invoked with the same arguments after a crash.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List all files matching `query`.
    ///
    /// The implementation loops over pagination tokens internally and
    /// returns the complete result set.
    async fn list_files(&self, query: &ListQuery) -> Result<Vec<RemoteFileSnapshot>>;

    /// Create a new remote file from a local path.
    ///
    /// Returns the provider-assigned remote id. Callers must not assume the
    /// id reaches durable local state; the worker re-resolves it by name via
    /// a follow-up listing.
    async fn create_file(
        &self,
        local_path: &Path,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> Result<String>;

    /// Overwrite the content of an existing remote file.
    async fn update_file(&self, remote_id: &str, local_path: &Path, name: &str) -> Result<()>;

    /// Download the full content of a remote file.
    async fn download_file(&self, remote_id: &str) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_targets_plain_text() {
        let q = ListQuery::default();
        assert_eq!(q.query, "mimeType='text/plain'");
        assert_eq!(q.spaces, "drive");
        assert!(q.fields.contains("modifiedTime"));
    }

    #[test]
    fn scoped_query_includes_parent() {
        let q = ListQuery::scoped_to_folder("folder-9");
        assert!(q.query.contains("'folder-9' in parents"));
        assert_eq!(q.spaces, "drive");
    }
}
