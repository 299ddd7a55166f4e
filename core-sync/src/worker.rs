//! Durable queue worker.
//!
//! Executes pending commands oldest-first, one at a time. A command is
//! removed from the queue only after its side effect succeeded, so every
//! handler must tolerate re-execution after a crash. Collaborator errors
//! abort the drain with the failing command still queued; the next trigger
//! retries it. Commands that reference state which no longer exists are
//! dropped with a warning so one stale row cannot wedge the queue forever.

use std::sync::Arc;

use bridge_traits::remote::ListQuery;
use bridge_traits::{BlobStore, RemoteStore, SettingsProvider};
use core_store::{CommandId, CommandKind, CommandQueue, FileIndexRepository, PendingCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::reconcile::Reconciler;

/// Counters for one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Commands executed and removed
    pub completed: u64,
    /// Listing commands pushed behind pending mutations
    pub deferred: u64,
    /// Commands removed without executing because their referenced state
    /// is gone
    pub dropped: u64,
}

/// How a single command ended.
enum Disposition {
    Completed,
    Dropped,
}

/// Drains the durable command queue against the remote store.
///
/// `drain` is single-flight: a second concurrent call fails fast with
/// [`SyncError::DrainInProgress`] instead of interleaving queue access.
pub struct SyncWorker {
    remote: Arc<dyn RemoteStore>,
    blobs: Arc<dyn BlobStore>,
    settings: Arc<dyn SettingsProvider>,
    index: Arc<dyn FileIndexRepository>,
    queue: Arc<dyn CommandQueue>,
    reconciler: Reconciler,
    drain_lock: Mutex<()>,
}

impl SyncWorker {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        blobs: Arc<dyn BlobStore>,
        settings: Arc<dyn SettingsProvider>,
        index: Arc<dyn FileIndexRepository>,
        queue: Arc<dyn CommandQueue>,
    ) -> Self {
        let reconciler = Reconciler::new(index.clone(), queue.clone(), blobs.clone());
        Self {
            remote,
            blobs,
            settings,
            index,
            queue,
            reconciler,
            drain_lock: Mutex::new(()),
        }
    }

    /// Enqueue an upload of a never-synced local file.
    pub async fn queue_upload(&self, display_name: &str) -> Result<CommandId> {
        let id = self
            .queue
            .enqueue(CommandKind::Upload {
                display_name: display_name.to_string(),
                local_path: format!("_{}", display_name),
            })
            .await?;
        Ok(id)
    }

    /// Enqueue an overwrite of an already-linked remote file.
    pub async fn queue_update(&self, remote_id: &str, display_name: &str) -> Result<CommandId> {
        let id = self
            .queue
            .enqueue(CommandKind::Update {
                remote_id: remote_id.to_string(),
                display_name: display_name.to_string(),
                local_path: format!("{}_{}", remote_id, display_name),
            })
            .await?;
        Ok(id)
    }

    /// Enqueue a download of a remote file's content.
    pub async fn queue_download(&self, remote_id: &str, display_name: &str) -> Result<CommandId> {
        let id = self
            .queue
            .enqueue(CommandKind::Download {
                remote_id: remote_id.to_string(),
                display_name: display_name.to_string(),
            })
            .await?;
        Ok(id)
    }

    /// Enqueue a full listing-and-reconciliation pass.
    pub async fn queue_sync(&self) -> Result<CommandId> {
        let query = self.scoped_query().await?;
        let id = self.queue.enqueue(CommandKind::ListRemoteFiles { query }).await?;
        Ok(id)
    }

    /// Drain the queue until it is empty.
    #[instrument(skip_all)]
    pub async fn drain(&self) -> Result<DrainStats> {
        let _guard = self
            .drain_lock
            .try_lock()
            .map_err(|_| SyncError::DrainInProgress)?;

        let mut stats = DrainStats::default();

        while let Some(command) = self.queue.peek_oldest().await? {
            debug!(
                command_id = %command.id,
                kind = command.kind.as_str(),
                "Executing command"
            );

            // A listing pass re-reads every remote file; letting queued
            // mutations land first keeps it from immediately re-queuing the
            // same work it is about to observe half-done. Listing-only
            // queues run as-is, so deferral always terminates.
            if matches!(command.kind, CommandKind::ListRemoteFiles { .. })
                && self.has_pending_mutations().await?
            {
                self.queue.enqueue(command.kind.clone()).await?;
                self.queue.dequeue(command.id).await?;
                stats.deferred += 1;
                continue;
            }

            let disposition = self.execute(&command).await?;
            self.queue.dequeue(command.id).await?;

            match disposition {
                Disposition::Completed => stats.completed += 1,
                Disposition::Dropped => stats.dropped += 1,
            }
        }

        info!(
            completed = stats.completed,
            deferred = stats.deferred,
            dropped = stats.dropped,
            "Queue drained"
        );
        Ok(stats)
    }

    async fn execute(&self, command: &PendingCommand) -> Result<Disposition> {
        match &command.kind {
            CommandKind::Upload {
                display_name,
                local_path,
            } => self.run_upload(display_name, local_path).await,
            CommandKind::Update {
                remote_id,
                display_name,
                local_path,
            } => self.run_update(remote_id, display_name, local_path).await,
            CommandKind::Download {
                remote_id,
                display_name,
            } => self.run_download(remote_id, display_name).await,
            CommandKind::ListRemoteFiles { query } => self.run_list(query).await,
            CommandKind::FetchRemoteFileInfo {
                remote_id,
                display_name,
                query,
            } => {
                self.run_fetch_info(remote_id.as_deref(), display_name, query)
                    .await
            }
        }
    }

    /// Create a remote file from a local blob, then queue the id resolution.
    ///
    /// Re-execution safe: if a previous attempt crashed after the create
    /// call, the pre-check finds the file by name and skips the duplicate
    /// create.
    async fn run_upload(&self, display_name: &str, local_path: &str) -> Result<Disposition> {
        if !self.blobs.exists(local_path).await? {
            warn!(
                name = %display_name,
                blob = %local_path,
                "Upload references a missing blob, dropping command"
            );
            return Ok(Disposition::Dropped);
        }

        let parent = self.settings.remote_parent_folder().await?;
        let query = Self::query_for(parent.as_deref());

        // An unclaimed remote file under this name means a previous attempt
        // created it and crashed before the id came back. A claimed one
        // belongs to a different record and must not be mistaken for ours.
        let listing = self.remote.list_files(&query).await?;
        let mut already_uploaded = false;
        for snapshot in listing.iter().filter(|s| s.display_name == display_name) {
            if self.index.find_by_remote_id(&snapshot.remote_id).await?.is_none() {
                already_uploaded = true;
                break;
            }
        }

        if already_uploaded {
            debug!(name = %display_name, "Remote file already exists, skipping create");
        } else {
            let path = self.blobs.path_of(local_path)?;
            self.remote
                .create_file(&path, display_name, parent.as_deref())
                .await?;
            info!(name = %display_name, "Uploaded new remote file");
        }

        self.queue
            .enqueue(CommandKind::FetchRemoteFileInfo {
                remote_id: None,
                display_name: display_name.to_string(),
                query,
            })
            .await?;
        Ok(Disposition::Completed)
    }

    /// Overwrite an existing remote file, then queue the timestamp refresh.
    async fn run_update(
        &self,
        remote_id: &str,
        display_name: &str,
        local_path: &str,
    ) -> Result<Disposition> {
        if !self.blobs.exists(local_path).await? {
            warn!(
                remote_id = %remote_id,
                blob = %local_path,
                "Update references a missing blob, dropping command"
            );
            return Ok(Disposition::Dropped);
        }

        let path = self.blobs.path_of(local_path)?;
        self.remote.update_file(remote_id, &path, display_name).await?;
        info!(remote_id = %remote_id, name = %display_name, "Updated remote file");

        self.queue
            .enqueue(CommandKind::FetchRemoteFileInfo {
                remote_id: Some(remote_id.to_string()),
                display_name: display_name.to_string(),
                query: self.scoped_query().await?,
            })
            .await?;
        Ok(Disposition::Completed)
    }

    /// Fetch remote content into the blob store under the linked name, then
    /// queue the timestamp refresh.
    async fn run_download(&self, remote_id: &str, display_name: &str) -> Result<Disposition> {
        let content = self.remote.download_file(remote_id).await?;

        // Land under the unlinked name first so a crash between write and
        // rename leaves either the old linked blob or a complete staging
        // copy, never a torn linked blob.
        let staging = format!("_{}", display_name);
        self.blobs.write(&staging, content).await?;
        self.blobs
            .rename(&staging, &format!("{}_{}", remote_id, display_name))
            .await?;

        info!(remote_id = %remote_id, name = %display_name, "Downloaded remote file");

        self.queue
            .enqueue(CommandKind::FetchRemoteFileInfo {
                remote_id: Some(remote_id.to_string()),
                display_name: display_name.to_string(),
                query: self.scoped_query().await?,
            })
            .await?;
        Ok(Disposition::Completed)
    }

    /// Run one full listing and hand it to the reconciler.
    async fn run_list(&self, query: &ListQuery) -> Result<Disposition> {
        let listing = self.remote.list_files(query).await?;
        self.reconciler.reconcile(&listing).await?;
        Ok(Disposition::Completed)
    }

    /// Re-resolve one file against a fresh listing and persist its remote id
    /// and modify time. An upload's record is still unlinked here; linking
    /// it also moves the cached blob to the linked naming convention.
    async fn run_fetch_info(
        &self,
        remote_id: Option<&str>,
        display_name: &str,
        query: &ListQuery,
    ) -> Result<Disposition> {
        let record = match remote_id {
            Some(id) => self.index.find_by_remote_id(id).await?,
            None => self.index.find_by_name(display_name).await?,
        };
        let Some(record) = record else {
            warn!(
                name = %display_name,
                "No index record for fetched file info, dropping command"
            );
            return Ok(Disposition::Dropped);
        };

        // Among name matches, only an unclaimed remote file (or the one this
        // record is already linked to) can be ours; a file claimed by a
        // different record is a same-name sibling.
        let listing = self.remote.list_files(query).await?;
        let mut chosen = None;
        for snapshot in listing.iter().filter(|s| record.matches(s)) {
            match self.index.find_by_remote_id(&snapshot.remote_id).await? {
                None => {
                    chosen = Some(snapshot);
                    break;
                }
                Some(owner) if owner.id == record.id => {
                    chosen = Some(snapshot);
                    break;
                }
                Some(_) => {}
            }
        }
        let Some(snapshot) = chosen else {
            warn!(
                name = %display_name,
                "Remote file vanished before its info was fetched, dropping command"
            );
            return Ok(Disposition::Dropped);
        };

        let was_unlinked = !record.is_linked();

        let mut updated = record.clone();
        updated.remote_id = Some(snapshot.remote_id.clone());
        updated.local_modified_at = snapshot.modified_at;
        updated.last_known_remote_modified_at = snapshot.modified_at;
        self.index.update(&updated).await?;

        if was_unlinked {
            self.blobs
                .rename(&record.unlinked_blob_name(), &updated.blob_name())
                .await?;
        }

        debug!(
            remote_id = %snapshot.remote_id,
            name = %updated.display_name,
            "Persisted fresh remote file info"
        );
        Ok(Disposition::Completed)
    }

    async fn has_pending_mutations(&self) -> Result<bool> {
        let pending = self.queue.list_pending().await?;
        Ok(pending
            .iter()
            .any(|c| !matches!(c.kind, CommandKind::ListRemoteFiles { .. })))
    }

    async fn scoped_query(&self) -> Result<ListQuery> {
        let parent = self.settings.remote_parent_folder().await?;
        Ok(Self::query_for(parent.as_deref()))
    }

    fn query_for(parent: Option<&str>) -> ListQuery {
        match parent {
            Some(folder) => ListQuery::scoped_to_folder(folder),
            None => ListQuery::default(),
        }
    }
}
