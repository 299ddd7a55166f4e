//! Durable command queue.
//!
//! Every pending network operation is one row; FIFO order is the
//! autoincrement id and is the only ordering guarantee. Rows are removed
//! only after their side effect has completed, so a crash mid-drain leaves
//! the command in place for the next trigger (at-least-once execution).

use async_trait::async_trait;
use bridge_traits::remote::ListQuery;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Type-safe command row identifier (SQLite rowid, defines FIFO order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(i64);

impl CommandId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five operations the worker knows how to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Create a new remote file from a local blob
    Upload {
        display_name: String,
        local_path: String,
    },
    /// Overwrite an existing remote file with local content
    Update {
        remote_id: String,
        display_name: String,
        local_path: String,
    },
    /// Fetch a remote file's content into the local blob store
    Download {
        remote_id: String,
        display_name: String,
    },
    /// Run a full listing and reconciliation pass
    ListRemoteFiles { query: ListQuery },
    /// Re-resolve one file's remote id and modify time after a mutation
    FetchRemoteFileInfo {
        remote_id: Option<String>,
        display_name: String,
        query: ListQuery,
    },
}

impl CommandKind {
    /// Database discriminator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "upload",
            Self::Update { .. } => "update",
            Self::Download { .. } => "download",
            Self::ListRemoteFiles { .. } => "list_remote_files",
            Self::FetchRemoteFileInfo { .. } => "fetch_remote_file_info",
        }
    }
}

/// One queued operation with its FIFO position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub id: CommandId,
    pub kind: CommandKind,
    /// Unix timestamp when enqueued
    pub created_at: i64,
}

/// Queue contract consumed by the reconciler and the worker.
#[async_trait]
pub trait CommandQueue: Send + Sync {
    /// Append a command at the tail.
    async fn enqueue(&self, kind: CommandKind) -> Result<CommandId>;

    /// The oldest pending command, or `None` when the queue is empty.
    async fn peek_oldest(&self) -> Result<Option<PendingCommand>>;

    /// Remove a command by id. Removing an absent id is a no-op: the same
    /// command can legitimately be deleted twice on retry paths.
    async fn dequeue(&self, id: CommandId) -> Result<()>;

    /// All pending commands, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingCommand>>;

    /// Number of pending commands.
    async fn count(&self) -> Result<u64>;
}

/// SQLite implementation of the command queue.
pub struct SqliteCommandQueue {
    pool: SqlitePool,
}

impl SqliteCommandQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS command_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                remote_id TEXT,
                display_name TEXT,
                local_path TEXT,
                query_json TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn command_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PendingCommand> {
        let id: i64 = row.get("id");
        let kind: String = row.get("kind");
        let remote_id: Option<String> = row.get("remote_id");
        let display_name: Option<String> = row.get("display_name");
        let local_path: Option<String> = row.get("local_path");
        let query_json: Option<String> = row.get("query_json");

        let missing = |field: &str| StoreError::InvalidCommand {
            id,
            reason: format!("missing {} for kind '{}'", field, kind),
        };

        let kind = match kind.as_str() {
            "upload" => CommandKind::Upload {
                display_name: display_name.ok_or_else(|| missing("display_name"))?,
                local_path: local_path.ok_or_else(|| missing("local_path"))?,
            },
            "update" => CommandKind::Update {
                remote_id: remote_id.ok_or_else(|| missing("remote_id"))?,
                display_name: display_name.ok_or_else(|| missing("display_name"))?,
                local_path: local_path.ok_or_else(|| missing("local_path"))?,
            },
            "download" => CommandKind::Download {
                remote_id: remote_id.ok_or_else(|| missing("remote_id"))?,
                display_name: display_name.ok_or_else(|| missing("display_name"))?,
            },
            "list_remote_files" => CommandKind::ListRemoteFiles {
                query: serde_json::from_str(&query_json.ok_or_else(|| missing("query_json"))?)?,
            },
            "fetch_remote_file_info" => CommandKind::FetchRemoteFileInfo {
                remote_id,
                display_name: display_name.ok_or_else(|| missing("display_name"))?,
                query: serde_json::from_str(&query_json.ok_or_else(|| missing("query_json"))?)?,
            },
            other => {
                return Err(StoreError::InvalidCommand {
                    id,
                    reason: format!("unknown kind '{}'", other),
                })
            }
        };

        Ok(PendingCommand {
            id: CommandId::new(id),
            kind,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl CommandQueue for SqliteCommandQueue {
    async fn enqueue(&self, kind: CommandKind) -> Result<CommandId> {
        let (remote_id, display_name, local_path, query_json) = match &kind {
            CommandKind::Upload {
                display_name,
                local_path,
            } => (None, Some(display_name.clone()), Some(local_path.clone()), None),
            CommandKind::Update {
                remote_id,
                display_name,
                local_path,
            } => (
                Some(remote_id.clone()),
                Some(display_name.clone()),
                Some(local_path.clone()),
                None,
            ),
            CommandKind::Download {
                remote_id,
                display_name,
            } => (
                Some(remote_id.clone()),
                Some(display_name.clone()),
                None,
                None,
            ),
            CommandKind::ListRemoteFiles { query } => {
                (None, None, None, Some(serde_json::to_string(query)?))
            }
            CommandKind::FetchRemoteFileInfo {
                remote_id,
                display_name,
                query,
            } => (
                remote_id.clone(),
                Some(display_name.clone()),
                None,
                Some(serde_json::to_string(query)?),
            ),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO command_queue (kind, remote_id, display_name, local_path, query_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(kind.as_str())
        .bind(remote_id)
        .bind(display_name)
        .bind(local_path)
        .bind(query_json)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let id = CommandId::new(result.last_insert_rowid());
        debug!(command_id = %id, kind = kind.as_str(), "Enqueued command");
        Ok(id)
    }

    async fn peek_oldest(&self) -> Result<Option<PendingCommand>> {
        let row = sqlx::query(
            "SELECT id, kind, remote_id, display_name, local_path, query_json, created_at \
             FROM command_queue ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::command_from_row).transpose()
    }

    async fn dequeue(&self, id: CommandId) -> Result<()> {
        let result = sqlx::query("DELETE FROM command_queue WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        debug!(
            command_id = %id,
            removed = result.rows_affected(),
            "Dequeued command"
        );
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<PendingCommand>> {
        let rows = sqlx::query(
            "SELECT id, kind, remote_id, display_name, local_path, query_json, created_at \
             FROM command_queue ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::command_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM command_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
