//! File index data model.

use bridge_traits::remote::RemoteFileSnapshot;
use serde::{Deserialize, Serialize};

/// Type-safe file index row identifier (SQLite rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for one tracked file: its display name, remote linkage, and the
/// two persisted timestamps the reconciler compares against the remote
/// listing.
///
/// `remote_id == None` means the file exists only locally and is an upload
/// candidate. When linked, the cached blob lives under
/// `"<remote_id>_<display_name>"`; unlinked, under `"_<display_name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: RecordId,
    pub display_name: String,
    pub remote_id: Option<String>,
    /// Last time the local content blob changed, Unix seconds
    pub local_modified_at: i64,
    /// Remote modify time observed at the last successful reconciliation
    pub last_known_remote_modified_at: i64,
}

impl LocalRecord {
    /// Whether this record is linked to a remote file.
    pub fn is_linked(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Blob name under the current linkage state.
    pub fn blob_name(&self) -> String {
        match &self.remote_id {
            Some(remote_id) => format!("{}_{}", remote_id, self.display_name),
            None => self.unlinked_blob_name(),
        }
    }

    /// Blob name under the unlinked (pending-upload) convention.
    pub fn unlinked_blob_name(&self) -> String {
        format!("_{}", self.display_name)
    }

    /// Whether a remote snapshot refers to this record: names must match,
    /// and if a remote id is already known it must match too.
    pub fn matches(&self, snapshot: &RemoteFileSnapshot) -> bool {
        self.display_name == snapshot.display_name
            && match &self.remote_id {
                Some(id) => *id == snapshot.remote_id,
                None => true,
            }
    }
}

/// Insertion payload for a new file index row.
#[derive(Debug, Clone)]
pub struct NewLocalRecord {
    pub display_name: String,
    pub remote_id: Option<String>,
    pub local_modified_at: i64,
    pub last_known_remote_modified_at: i64,
}

impl NewLocalRecord {
    /// A file that exists only locally and has never been uploaded.
    pub fn untracked(display_name: impl Into<String>, local_modified_at: i64) -> Self {
        Self {
            display_name: display_name.into(),
            remote_id: None,
            local_modified_at,
            last_known_remote_modified_at: 0,
        }
    }

    /// A file first observed in a remote listing, not yet downloaded.
    pub fn from_remote(display_name: impl Into<String>, snapshot: &RemoteFileSnapshot) -> Self {
        Self {
            display_name: display_name.into(),
            remote_id: Some(snapshot.remote_id.clone()),
            local_modified_at: snapshot.modified_at,
            last_known_remote_modified_at: snapshot.modified_at,
        }
    }
}
