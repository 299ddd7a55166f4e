//! Settings providers

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::SettingsProvider;
use sqlx::{sqlite::SqlitePool, Row};
use std::path::PathBuf;
use tracing::debug;

const PARENT_FOLDER_KEY: &str = "remote_parent_folder";

/// Fixed in-process settings, for embedding hosts and tests.
pub struct StaticSettings {
    parent_folder: Option<String>,
}

impl StaticSettings {
    pub fn new(parent_folder: Option<String>) -> Self {
        Self { parent_folder }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn remote_parent_folder(&self) -> Result<Option<String>> {
        Ok(self.parent_folder.clone())
    }
}

/// SQLite-backed key-value settings store.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open (or create) a settings database at the given path.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // SQLite URLs want forward slashes, also on Windows.
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{}?mode=rwc", path_str);

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let store = Self { pool };
        store.create_table().await?;
        debug!(path = ?db_path, "Initialized settings store");
        Ok(store)
    }

    /// In-memory settings store, for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let store = Self { pool };
        store.create_table().await?;
        Ok(store)
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        debug!(key = key, "Stored setting");
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to get setting: {}", e)))?;

        Ok(row.map(|r| r.get(0)))
    }

    async fn delete_value(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to delete setting: {}", e)))?;

        debug!(key = key, "Deleted setting");
        Ok(())
    }

    /// Set or clear the remote parent folder that scopes all sync traffic.
    pub async fn set_remote_parent_folder(&self, folder_id: Option<&str>) -> Result<()> {
        match folder_id {
            Some(id) => self.set_value(PARENT_FOLDER_KEY, id).await,
            None => self.delete_value(PARENT_FOLDER_KEY).await,
        }
    }
}

#[async_trait]
impl SettingsProvider for SqliteSettingsStore {
    async fn remote_parent_folder(&self) -> Result<Option<String>> {
        self.get_value(PARENT_FOLDER_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_settings_return_configured_folder() {
        let settings = StaticSettings::new(Some("folder-1".to_string()));
        assert_eq!(
            settings.remote_parent_folder().await.unwrap(),
            Some("folder-1".to_string())
        );

        let settings = StaticSettings::new(None);
        assert_eq!(settings.remote_parent_folder().await.unwrap(), None);
    }

    #[tokio::test]
    async fn parent_folder_round_trips() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        assert_eq!(store.remote_parent_folder().await.unwrap(), None);

        store
            .set_remote_parent_folder(Some("folder-9"))
            .await
            .unwrap();
        assert_eq!(
            store.remote_parent_folder().await.unwrap(),
            Some("folder-9".to_string())
        );

        store.set_remote_parent_folder(None).await.unwrap();
        assert_eq!(store.remote_parent_folder().await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwriting_replaces_previous_value() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store
            .set_remote_parent_folder(Some("folder-1"))
            .await
            .unwrap();
        store
            .set_remote_parent_folder(Some("folder-2"))
            .await
            .unwrap();

        assert_eq!(
            store.remote_parent_folder().await.unwrap(),
            Some("folder-2".to_string())
        );
    }
}
