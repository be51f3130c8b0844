//! Database repository for the options table.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Key-value access to named options.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read an option's JSON value, `None` when it was never written.
    pub async fn get_option(&self, name: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT value FROM options WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Replace an option's value in a single statement.
    pub async fn update_option(&self, name: &str, value: &Value) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::to_string(value).map_err(AppError::serialization)?;

        sqlx::query(
            "INSERT INTO options (name, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(&raw)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use serde_json::json;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_missing_option_is_none() {
        let (repo, _dir) = repo().await;

        assert!(repo.get_option("chat_widget").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_whole_value() {
        let (repo, _dir) = repo().await;

        repo.update_option("chat_widget", &json!({"a": "1", "b": "2"}))
            .await
            .unwrap();
        repo.update_option("chat_widget", &json!({"a": "3"}))
            .await
            .unwrap();

        let value = repo.get_option("chat_widget").await.unwrap().unwrap();
        assert_eq!(value, json!({"a": "3"}));
    }

    #[tokio::test]
    async fn test_options_are_independent() {
        let (repo, _dir) = repo().await;

        repo.update_option("one", &json!("x")).await.unwrap();
        repo.update_option("two", &json!("y")).await.unwrap();

        assert_eq!(repo.get_option("one").await.unwrap(), Some(json!("x")));
        assert_eq!(repo.get_option("two").await.unwrap(), Some(json!("y")));
    }
}
