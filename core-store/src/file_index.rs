//! File index repository.
//!
//! Persistent mapping from a local record id to display name, remote
//! linkage, and timestamps. Lookups that find nothing return `Ok(None)`;
//! "not found" is an ordinary answer here, not a failure.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{LocalRecord, NewLocalRecord, RecordId};

/// Repository contract for the file index.
#[async_trait]
pub trait FileIndexRepository: Send + Sync {
    /// Insert a new record, returning its assigned id.
    async fn insert(&self, record: &NewLocalRecord) -> Result<RecordId>;

    /// Persist every mutable field of an existing record.
    async fn update(&self, record: &LocalRecord) -> Result<()>;

    /// Detach a record from its remote file.
    async fn clear_remote_id(&self, id: RecordId) -> Result<()>;

    /// Find a record by id.
    async fn find(&self, id: RecordId) -> Result<Option<LocalRecord>>;

    /// Find the record linked to a remote id.
    async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<LocalRecord>>;

    /// Find a record by display name (collision checks).
    async fn find_by_name(&self, name: &str) -> Result<Option<LocalRecord>>;

    /// Find a record by display name and remote id together.
    async fn find_by_name_and_remote_id(
        &self,
        name: &str,
        remote_id: &str,
    ) -> Result<Option<LocalRecord>>;

    /// All records, in insertion order.
    async fn list_all(&self) -> Result<Vec<LocalRecord>>;
}

/// SQLite implementation of the file index.
pub struct SqliteFileIndexRepository {
    pool: SqlitePool,
}

impl SqliteFileIndexRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the backing table and indexes if they do not exist.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS file_index (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT NOT NULL,
                remote_id TEXT,
                local_modified_at INTEGER NOT NULL,
                remote_modified_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_file_index_remote_id ON file_index(remote_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_index_name ON file_index(display_name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> LocalRecord {
        LocalRecord {
            id: RecordId::new(row.get("id")),
            display_name: row.get("display_name"),
            remote_id: row.get("remote_id"),
            local_modified_at: row.get("local_modified_at"),
            last_known_remote_modified_at: row.get("remote_modified_at"),
        }
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        binds: &[&str],
    ) -> Result<Option<LocalRecord>> {
        let sql = format!(
            "SELECT id, display_name, remote_id, local_modified_at, remote_modified_at \
             FROM file_index WHERE {} ORDER BY id LIMIT 1",
            condition
        );
        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = query.bind(*bind);
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(Self::record_from_row))
    }
}

#[async_trait]
impl FileIndexRepository for SqliteFileIndexRepository {
    async fn insert(&self, record: &NewLocalRecord) -> Result<RecordId> {
        let result = sqlx::query(
            r#"
            INSERT INTO file_index (display_name, remote_id, local_modified_at, remote_modified_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.display_name)
        .bind(&record.remote_id)
        .bind(record.local_modified_at)
        .bind(record.last_known_remote_modified_at)
        .execute(&self.pool)
        .await?;

        let id = RecordId::new(result.last_insert_rowid());
        debug!(record_id = %id, name = %record.display_name, "Inserted file index record");
        Ok(id)
    }

    async fn update(&self, record: &LocalRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE file_index SET
                display_name = ?,
                remote_id = ?,
                local_modified_at = ?,
                remote_modified_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.display_name)
        .bind(&record.remote_id)
        .bind(record.local_modified_at)
        .bind(record.last_known_remote_modified_at)
        .bind(record.id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_remote_id(&self, id: RecordId) -> Result<()> {
        sqlx::query("UPDATE file_index SET remote_id = NULL WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        debug!(record_id = %id, "Cleared remote id");
        Ok(())
    }

    async fn find(&self, id: RecordId) -> Result<Option<LocalRecord>> {
        let row = sqlx::query(
            "SELECT id, display_name, remote_id, local_modified_at, remote_modified_at \
             FROM file_index WHERE id = ? LIMIT 1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::record_from_row))
    }

    async fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<LocalRecord>> {
        self.fetch_one_where("remote_id = ?", &[remote_id]).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<LocalRecord>> {
        self.fetch_one_where("display_name = ?", &[name]).await
    }

    async fn find_by_name_and_remote_id(
        &self,
        name: &str,
        remote_id: &str,
    ) -> Result<Option<LocalRecord>> {
        self.fetch_one_where("display_name = ? AND remote_id = ?", &[name, remote_id])
            .await
    }

    async fn list_all(&self) -> Result<Vec<LocalRecord>> {
        let rows = sqlx::query(
            "SELECT id, display_name, remote_id, local_modified_at, remote_modified_at \
             FROM file_index ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::record_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup() -> SqliteFileIndexRepository {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteFileIndexRepository::new(pool);
        repo.initialize().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn insert_and_find() {
        let repo = setup().await;
        let id = repo
            .insert(&NewLocalRecord::untracked("notes.txt", 100))
            .await
            .unwrap();

        let record = repo.find(id).await.unwrap().unwrap();
        assert_eq!(record.display_name, "notes.txt");
        assert_eq!(record.remote_id, None);
        assert_eq!(record.local_modified_at, 100);
        assert_eq!(record.last_known_remote_modified_at, 0);
    }

    #[tokio::test]
    async fn absence_is_none_not_error() {
        let repo = setup().await;
        assert!(repo.find(RecordId::new(42)).await.unwrap().is_none());
        assert!(repo.find_by_remote_id("missing").await.unwrap().is_none());
        assert!(repo.find_by_name("missing.txt").await.unwrap().is_none());
        assert!(repo
            .find_by_name_and_remote_id("missing.txt", "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_by_remote_id_and_name() {
        let repo = setup().await;
        repo.insert(&NewLocalRecord {
            display_name: "a.txt".to_string(),
            remote_id: Some("R1".to_string()),
            local_modified_at: 10,
            last_known_remote_modified_at: 10,
        })
        .await
        .unwrap();

        let by_id = repo.find_by_remote_id("R1").await.unwrap().unwrap();
        assert_eq!(by_id.display_name, "a.txt");

        let by_name = repo.find_by_name("a.txt").await.unwrap().unwrap();
        assert_eq!(by_name.remote_id.as_deref(), Some("R1"));

        let by_both = repo
            .find_by_name_and_remote_id("a.txt", "R1")
            .await
            .unwrap();
        assert!(by_both.is_some());
        let mismatched = repo
            .find_by_name_and_remote_id("a.txt", "R2")
            .await
            .unwrap();
        assert!(mismatched.is_none());
    }

    #[tokio::test]
    async fn find_by_name_prefers_oldest_on_duplicate_names() {
        let repo = setup().await;
        let first = repo
            .insert(&NewLocalRecord::untracked("dup.txt", 10))
            .await
            .unwrap();
        repo.insert(&NewLocalRecord {
            display_name: "dup.txt".to_string(),
            remote_id: Some("R1".to_string()),
            local_modified_at: 20,
            last_known_remote_modified_at: 20,
        })
        .await
        .unwrap();

        let found = repo.find_by_name("dup.txt").await.unwrap().unwrap();
        assert_eq!(found.id, first);
    }

    #[tokio::test]
    async fn update_persists_all_fields() {
        let repo = setup().await;
        let id = repo
            .insert(&NewLocalRecord::untracked("draft.txt", 5))
            .await
            .unwrap();

        let mut record = repo.find(id).await.unwrap().unwrap();
        record.display_name = "draft(1).txt".to_string();
        record.remote_id = Some("R9".to_string());
        record.local_modified_at = 50;
        record.last_known_remote_modified_at = 50;
        repo.update(&record).await.unwrap();

        let reloaded = repo.find(id).await.unwrap().unwrap();
        assert_eq!(reloaded, record);
    }

    #[tokio::test]
    async fn clear_remote_id_detaches() {
        let repo = setup().await;
        let id = repo
            .insert(&NewLocalRecord {
                display_name: "a.txt".to_string(),
                remote_id: Some("R1".to_string()),
                local_modified_at: 10,
                last_known_remote_modified_at: 10,
            })
            .await
            .unwrap();

        repo.clear_remote_id(id).await.unwrap();
        let record = repo.find(id).await.unwrap().unwrap();
        assert_eq!(record.remote_id, None);
    }

    #[tokio::test]
    async fn list_all_in_insertion_order() {
        let repo = setup().await;
        for name in ["a.txt", "b.txt", "c.txt"] {
            repo.insert(&NewLocalRecord::untracked(name, 1))
                .await
                .unwrap();
        }

        let names: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }
}
