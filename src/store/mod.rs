//! Configuration store for the widget settings record.
//!
//! Callers hold an `Arc<dyn ConfigurationStore>`; the backing persistence is
//! chosen at startup.

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::ConfigurationRecord;

/// Load/save access to the one settings record of a deployment.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Read the record merged over the defaults. Never fails: missing or
    /// unreadable storage yields the defaults.
    async fn load(&self) -> ConfigurationRecord;

    /// Replace the stored record in full.
    async fn save(&self, record: &ConfigurationRecord) -> Result<(), AppError>;
}

/// Store backed by the SQLite options table.
#[derive(Clone)]
pub struct SqliteStore {
    repo: Repository,
    option_name: String,
}

impl SqliteStore {
    pub fn new(repo: Repository, option_name: impl Into<String>) -> Self {
        Self {
            repo,
            option_name: option_name.into(),
        }
    }
}

#[async_trait]
impl ConfigurationStore for SqliteStore {
    async fn load(&self) -> ConfigurationRecord {
        match self.repo.get_option(&self.option_name).await {
            Ok(Some(value)) => ConfigurationRecord::from_stored(&value),
            Ok(None) => ConfigurationRecord::defaults(),
            Err(e) => {
                tracing::warn!(
                    "Failed to load option {}, using defaults: {}",
                    self.option_name,
                    e
                );
                ConfigurationRecord::defaults()
            }
        }
    }

    async fn save(&self, record: &ConfigurationRecord) -> Result<(), AppError> {
        let value = serde_json::to_value(record).map_err(AppError::serialization)?;
        self.repo.update_option(&self.option_name, &value).await?;
        tracing::info!("Saved option {}", self.option_name);
        Ok(())
    }
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    value: RwLock<Option<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw stored value, as if a previous deployment had written it.
    #[cfg(test)]
    pub fn with_value(value: Value) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }
}

#[async_trait]
impl ConfigurationStore for MemoryStore {
    async fn load(&self) -> ConfigurationRecord {
        let guard = match self.value.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match guard.as_ref() {
            Some(value) => ConfigurationRecord::from_stored(value),
            None => ConfigurationRecord::defaults(),
        }
    }

    async fn save(&self, record: &ConfigurationRecord) -> Result<(), AppError> {
        let value = serde_json::to_value(record).map_err(AppError::serialization)?;
        let mut guard = self
            .value
            .write()
            .map_err(|_| AppError::Internal("Settings lock poisoned".to_string()))?;
        *guard = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_starts_with_defaults() {
        let store = MemoryStore::new();

        assert_eq!(store.load().await, ConfigurationRecord::defaults());
    }

    #[tokio::test]
    async fn test_memory_store_merges_partial_value() {
        let store = MemoryStore::with_value(json!({ "branding_name": "Acme" }));
        let record = store.load().await;

        assert_eq!(record.branding_name, "Acme");
        assert_eq!(record.webhook_route, "general");
    }

    #[tokio::test]
    async fn test_memory_store_save_replaces() {
        let store = MemoryStore::new();
        let mut record = ConfigurationRecord::defaults();
        record.position = "left".to_string();

        store.save(&record).await.unwrap();

        assert_eq!(store.load().await, record);
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();
        let store = SqliteStore::new(Repository::new(pool), "chat_widget");

        assert_eq!(store.load().await, ConfigurationRecord::defaults());

        let mut record = ConfigurationRecord::defaults();
        record.webhook_url = "https://hooks.example.com/chat".to_string();
        record.suggested_questions = "Pricing?, Hours?".to_string();
        store.save(&record).await.unwrap();

        assert_eq!(store.load().await, record);
    }

    #[tokio::test]
    async fn test_sqlite_store_defaults_fields_added_later() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();
        let repo = Repository::new(pool);
        // Written before font_color and suggested_questions existed
        repo.update_option(
            "chat_widget",
            &json!({ "webhook_url": "https://hooks.example.com", "position": "left" }),
        )
        .await
        .unwrap();

        let store = SqliteStore::new(repo, "chat_widget");
        let record = store.load().await;

        assert_eq!(record.webhook_url, "https://hooks.example.com");
        assert_eq!(record.position, "left");
        assert_eq!(record.font_color, "#1f2937");
        assert_eq!(record.suggested_questions, "");
    }

    #[tokio::test]
    async fn test_sqlite_store_unavailable_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();
        let store = SqliteStore::new(Repository::new(pool.clone()), "chat_widget");
        pool.close().await;

        assert_eq!(store.load().await, ConfigurationRecord::defaults());
    }

    #[tokio::test]
    async fn test_concurrent_reads_see_whole_records() {
        let store = Arc::new(MemoryStore::new());
        let mut first = ConfigurationRecord::defaults();
        first.branding_name = "First".to_string();
        first.primary_color = "#111111".to_string();
        let mut second = ConfigurationRecord::defaults();
        second.branding_name = "Second".to_string();
        second.primary_color = "#222222".to_string();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let record = if i % 2 == 0 { &first } else { &second };
                    store.save(record).await.unwrap();
                }
            })
        };

        for _ in 0..200 {
            let record = store.load().await;
            match record.branding_name.as_str() {
                "First" => assert_eq!(record.primary_color, "#111111"),
                "Second" => assert_eq!(record.primary_color, "#222222"),
                _ => assert_eq!(record, ConfigurationRecord::defaults()),
            }
        }

        writer.await.unwrap();
    }
}
