use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;

const MAX_CONNECTIONS_DEFAULT: u32 = 5;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(
                std::env::var("BACKYARD_DB_PATH").unwrap_or_else(|_| "backyard.db".to_string()),
            ),
            max_connections: std::env::var("BACKYARD_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS_DEFAULT.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS_DEFAULT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    config: DatabaseConfig,
}

impl Database {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to open SQLite database at {}", config.path.display())
            })?;

        let db = Self {
            pool,
            config: config.clone(),
        };

        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS board_settings (
                user_id TEXT PRIMARY KEY NOT NULL,
                settings TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create board_settings table")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: temp_dir.path().join("test.db"),
            max_connections: 1,
        };

        let db = Database::new(config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM board_settings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(db.config().max_connections, 1);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: temp_dir.path().join("test.db"),
            max_connections: 1,
        };

        let first = Database::new(config.clone()).await.unwrap();
        drop(first);
        Database::new(config).await.unwrap();
    }
}
