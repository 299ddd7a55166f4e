//! Reconciliation algorithm.
//!
//! One pass compares a freshly fetched remote listing against the file
//! index and, for every file, decides: download it, push the local copy up,
//! fork it as a conflict, or leave it alone. Decisions become durable queue
//! commands; the only synchronous side effects are local blob rename/delete
//! bookkeeping, which must stay consistent with the index mutation made in
//! the same step.
//!
//! The decision uses three timestamps per file: the local modify time, the
//! remote modify time observed at the last successful sync, and the remote
//! modify time in the current listing. Remote older than last-known means
//! the local copy is ahead (push up); remote newer means download. When the
//! last-known point is strictly older than both sides, both changed
//! independently and the file is a conflict: the local copy is detached and
//! renamed, and the remote copy is re-downloaded under a fresh record.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::remote::RemoteFileSnapshot;
use bridge_traits::BlobStore;
use core_store::{CommandKind, CommandQueue, FileIndexRepository, LocalRecord, NewLocalRecord};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::naming::resolve_collision;

/// Per-file classification flags, computed before any mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Classification {
    download: bool,
    update: bool,
    conflict: bool,
    /// An unrelated local record already uses the remote file's name
    name_collision: bool,
    /// A local record is already linked to this remote id
    exists_locally: bool,
    /// The linked record's name differs from the remote name
    name_changed: bool,
}

/// Classify one remote file against its (possibly absent) local record.
///
/// `name_taken` is whether any local record already uses the remote file's
/// display name.
fn classify(
    local: Option<&LocalRecord>,
    remote: &RemoteFileSnapshot,
    name_taken: bool,
) -> Classification {
    let mut class = Classification::default();

    let Some(local) = local else {
        class.download = true;
        class.name_collision = name_taken;
        return class;
    };

    class.exists_locally = true;
    class.name_changed = local.display_name != remote.display_name;

    match remote.modified_at.cmp(&local.last_known_remote_modified_at) {
        std::cmp::Ordering::Less => class.update = true,
        std::cmp::Ordering::Greater => class.download = true,
        std::cmp::Ordering::Equal => {}
    }

    // Both sides moved past the last known-good sync point: conflict wins
    // over any update/download classification, regardless of which side is
    // chronologically later.
    if local.last_known_remote_modified_at < local.local_modified_at
        && local.last_known_remote_modified_at < remote.modified_at
    {
        class.conflict = true;
        class.download = false;
        class.update = false;
    }

    class
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Download commands enqueued
    pub downloads: u64,
    /// Update commands enqueued
    pub updates: u64,
    /// Conflicts forked
    pub conflicts: u64,
    /// Upload commands enqueued for local-only records
    pub uploads: u64,
    /// Records detached because their remote file disappeared
    pub detached: u64,
}

/// The decision core: mutates the file index and the command queue, plus
/// local blob bookkeeping. No network I/O; remote effects are deferred to
/// queued commands executed by the worker.
pub struct Reconciler {
    index: Arc<dyn FileIndexRepository>,
    queue: Arc<dyn CommandQueue>,
    blobs: Arc<dyn BlobStore>,
}

impl Reconciler {
    pub fn new(
        index: Arc<dyn FileIndexRepository>,
        queue: Arc<dyn CommandQueue>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            index,
            queue,
            blobs,
        }
    }

    /// Run one full reconciliation pass over a complete remote listing.
    #[instrument(skip_all, fields(remote_files = remote_files.len()))]
    pub async fn reconcile(&self, remote_files: &[RemoteFileSnapshot]) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        let mut seen_remote_ids: HashSet<String> = HashSet::new();

        for remote in remote_files {
            seen_remote_ids.insert(remote.remote_id.clone());

            let local = self.index.find_by_remote_id(&remote.remote_id).await?;
            let name_taken = self
                .index
                .find_by_name(&remote.display_name)
                .await?
                .is_some();
            let class = classify(local.as_ref(), remote, name_taken);

            debug!(
                remote_id = %remote.remote_id,
                name = %remote.display_name,
                ?class,
                "Classified remote file"
            );

            match local {
                Some(local) if class.conflict => {
                    self.resolve_conflict(&local, remote, class).await?;
                    stats.conflicts += 1;
                    stats.downloads += 1;
                }
                Some(local) if class.download => {
                    self.resolve_known_download(&local, remote, class).await?;
                    stats.downloads += 1;
                }
                Some(local) if class.update => {
                    self.resolve_update(&local, remote).await?;
                    stats.updates += 1;
                }
                Some(_) => {} // in sync, nothing to do
                None => {
                    self.resolve_new_download(remote, class).await?;
                    stats.downloads += 1;
                }
            }
        }

        self.sweep_local_only(&seen_remote_ids, &mut stats).await?;

        info!(
            downloads = stats.downloads,
            updates = stats.updates,
            conflicts = stats.conflicts,
            uploads = stats.uploads,
            detached = stats.detached,
            "Reconciliation pass complete"
        );

        Ok(stats)
    }

    /// Both sides changed: detach the local copy under a local-only name,
    /// then track the remote copy as a fresh record and download it.
    async fn resolve_conflict(
        &self,
        local: &LocalRecord,
        remote: &RemoteFileSnapshot,
        class: Classification,
    ) -> Result<()> {
        // If the remote was renamed, the local copy can keep its name; the
        // downloaded copy arrives under the new remote name. Otherwise the
        // local fork must move aside.
        let fork_name = if class.name_changed {
            local.display_name.clone()
        } else {
            self.free_name(&local.display_name).await?
        };

        self.blobs
            .rename(&local.blob_name(), &format!("_{}", fork_name))
            .await?;

        let mut forked = local.clone();
        forked.remote_id = None;
        forked.display_name = fork_name;
        forked.local_modified_at = remote.modified_at;
        forked.last_known_remote_modified_at = remote.modified_at;
        self.index.update(&forked).await?;

        let name_taken = self
            .index
            .find_by_name(&remote.display_name)
            .await?
            .is_some();
        let download_name = if name_taken {
            self.free_name(&remote.display_name).await?
        } else {
            remote.display_name.clone()
        };

        self.index
            .insert(&NewLocalRecord::from_remote(download_name.clone(), remote))
            .await?;
        self.queue
            .enqueue(CommandKind::Download {
                remote_id: remote.remote_id.clone(),
                display_name: download_name,
            })
            .await?;

        info!(
            remote_id = %remote.remote_id,
            forked_as = %forked.display_name,
            "Conflict forked into local-only copy plus fresh download"
        );
        Ok(())
    }

    /// Remote is newer than the last synced point for a tracked file.
    async fn resolve_known_download(
        &self,
        local: &LocalRecord,
        remote: &RemoteFileSnapshot,
        class: Classification,
    ) -> Result<()> {
        self.queue
            .enqueue(CommandKind::Download {
                remote_id: remote.remote_id.clone(),
                display_name: remote.display_name.clone(),
            })
            .await?;

        if class.name_changed {
            // Remote rename: the stale blob under the old name is dead.
            self.blobs.delete(&local.blob_name()).await?;

            let mut renamed = local.clone();
            renamed.display_name = remote.display_name.clone();
            renamed.local_modified_at = remote.modified_at;
            renamed.last_known_remote_modified_at = remote.modified_at;
            self.index.update(&renamed).await?;
        }

        Ok(())
    }

    /// Remote file with no matching local record: track and download it,
    /// moving aside only if an unrelated record holds its name.
    async fn resolve_new_download(
        &self,
        remote: &RemoteFileSnapshot,
        class: Classification,
    ) -> Result<()> {
        let target_name = if class.name_collision {
            self.free_name(&remote.display_name).await?
        } else {
            remote.display_name.clone()
        };

        self.index
            .insert(&NewLocalRecord::from_remote(target_name.clone(), remote))
            .await?;
        self.queue
            .enqueue(CommandKind::Download {
                remote_id: remote.remote_id.clone(),
                display_name: target_name,
            })
            .await?;

        Ok(())
    }

    /// Local copy is ahead of the last synced point: push it up.
    async fn resolve_update(&self, local: &LocalRecord, remote: &RemoteFileSnapshot) -> Result<()> {
        self.queue
            .enqueue(CommandKind::Update {
                remote_id: remote.remote_id.clone(),
                display_name: local.display_name.clone(),
                local_path: local.blob_name(),
            })
            .await?;
        Ok(())
    }

    /// After the remote loop: queue uploads for never-uploaded records and
    /// detach records whose remote file vanished from the listing.
    async fn sweep_local_only(
        &self,
        seen_remote_ids: &HashSet<String>,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        for record in self.index.list_all().await? {
            match &record.remote_id {
                None => {
                    self.queue
                        .enqueue(CommandKind::Upload {
                            display_name: record.display_name.clone(),
                            local_path: record.unlinked_blob_name(),
                        })
                        .await?;
                    stats.uploads += 1;
                }
                Some(remote_id) if !seen_remote_ids.contains(remote_id) => {
                    // Deleted on the remote side: keep the local content,
                    // fall back to the unlinked convention, and let a later
                    // pass pick it up as a fresh upload candidate.
                    self.blobs
                        .rename(&record.blob_name(), &record.unlinked_blob_name())
                        .await?;
                    self.index.clear_remote_id(record.id).await?;
                    stats.detached += 1;

                    info!(
                        remote_id = %remote_id,
                        name = %record.display_name,
                        "Remote file gone, detached local record"
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Collision-free display name against every name currently indexed.
    async fn free_name(&self, candidate: &str) -> Result<String> {
        let existing: HashSet<String> = self
            .index
            .list_all()
            .await?
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        resolve_collision(candidate, &existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::RecordId;

    fn record(remote_id: Option<&str>, name: &str, local_at: i64, known_at: i64) -> LocalRecord {
        LocalRecord {
            id: RecordId::new(1),
            display_name: name.to_string(),
            remote_id: remote_id.map(|s| s.to_string()),
            local_modified_at: local_at,
            last_known_remote_modified_at: known_at,
        }
    }

    fn snapshot(remote_id: &str, name: &str, modified_at: i64) -> RemoteFileSnapshot {
        RemoteFileSnapshot {
            remote_id: remote_id.to_string(),
            display_name: name.to_string(),
            modified_at,
            parent_ids: vec![],
        }
    }

    #[test]
    fn unknown_remote_id_classifies_as_download() {
        let class = classify(None, &snapshot("R1", "a.txt", 100), false);
        assert!(class.download);
        assert!(!class.exists_locally);
        assert!(!class.conflict && !class.update);
    }

    #[test]
    fn unknown_remote_id_with_taken_name_flags_collision() {
        let class = classify(None, &snapshot("R1", "a.txt", 100), true);
        assert!(class.download);
        assert!(class.name_collision);
    }

    #[test]
    fn equal_timestamps_are_a_fixed_point() {
        let local = record(Some("R1"), "a.txt", 100, 100);
        let class = classify(Some(&local), &snapshot("R1", "a.txt", 100), true);
        assert_eq!(
            class,
            Classification {
                exists_locally: true,
                ..Classification::default()
            }
        );
    }

    #[test]
    fn remote_newer_without_local_edit_is_download() {
        // last known T0, remote T2 > T0, local unchanged at T0
        let local = record(Some("R1"), "a.txt", 0, 0);
        let class = classify(Some(&local), &snapshot("R1", "a.txt", 2), true);
        assert!(class.download);
        assert!(class.exists_locally);
        assert!(!class.conflict);
    }

    #[test]
    fn remote_older_than_last_known_is_update() {
        let local = record(Some("R1"), "a.txt", 5, 5);
        let class = classify(Some(&local), &snapshot("R1", "a.txt", 3), true);
        assert!(class.update);
        assert!(!class.download && !class.conflict);
    }

    #[test]
    fn both_sides_changed_is_conflict_either_order() {
        // Local at T3, remote at T2, both past last-known T0
        let local = record(Some("R1"), "a.txt", 3, 0);
        let class = classify(Some(&local), &snapshot("R1", "a.txt", 2), true);
        assert!(class.conflict);
        assert!(!class.download && !class.update);

        // Chronological order of the two edits must not matter
        let local = record(Some("R1"), "a.txt", 2, 0);
        let class = classify(Some(&local), &snapshot("R1", "a.txt", 3), true);
        assert!(class.conflict);
        assert!(!class.download && !class.update);
    }

    #[test]
    fn rename_is_detected_alongside_other_flags() {
        let local = record(Some("R1"), "old.txt", 0, 0);
        let class = classify(Some(&local), &snapshot("R1", "new.txt", 2), false);
        assert!(class.name_changed);
        assert!(class.download);
    }
}
