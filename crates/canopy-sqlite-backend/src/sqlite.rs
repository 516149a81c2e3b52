use color_eyre::eyre::{Result, WrapErr};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::{path::Path, str::FromStr, time::Duration};

use crate::traits::StateStore;

const STATE_TABLE: &str = "global_state";

/// Explorer state kept in SQLite, either in a file or in memory.
#[derive(Debug, Clone)]
pub struct SqliteState {
    pool: SqlitePool,
}

impl SqliteState {
    /// Opens (creating if needed) the state database at `path`.
    pub async fn open(path: impl AsRef<Path>, timeout: f64) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).wrap_err_with(|| {
                    format!("Failed to create state directory {}", dir.display())
                })?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs_f64(timeout))
            .connect_with(opts)
            .await
            .wrap_err_with(|| format!("Failed to open SQLite state at {}", path.display()))?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::info!("Opened explorer state at {}", path.display());
        Ok(store)
    }

    /// In-memory state, used by tests and throwaway sessions.
    pub async fn new_in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .wrap_err("Failed to parse in-memory SQLite connection string")?
            .journal_mode(SqliteJournalMode::Memory)
            .create_if_missing(true);

        // Every connection to ":memory:" is a separate database, so pin the pool to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .wrap_err("Failed to create SQLite connection pool")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS global_state (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .wrap_err("Failed to create global_state table")?;

        Ok(())
    }

    async fn write_bytes(&self, key: String, value: Vec<u8>) -> Result<()> {
        let query_string = format!(
            "REPLACE INTO {} (key, value, updated_at) VALUES (?, ?, strftime('%s', 'now'))",
            STATE_TABLE
        );

        sqlx::query(&query_string)
            .bind(key.as_str())
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|sqlx_err| {
                tracing::error!("SQLxError in set_bytes for key '{}': {}.", key, sqlx_err);
                if let Some(db_err) = sqlx_err.as_database_error() {
                    tracing::error!(
                        "Underlying SQLite error - Code: {:?}, Message: {}",
                        db_err.code().unwrap_or_default(),
                        db_err.message()
                    );
                }
                color_eyre::eyre::eyre!(
                    "Failed to set key '{}' in SQLite state. Cause: {}",
                    key,
                    sqlx_err
                )
            })?;
        Ok(())
    }

    async fn read_bytes(&self, key: String) -> Result<Option<Vec<u8>>> {
        let query_string = format!("SELECT value FROM {} WHERE key = ?", STATE_TABLE);

        let row_option: Option<(Vec<u8>,)> = sqlx::query_as(&query_string)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .wrap_err_with(|| format!("SqliteState: Failed to get key '{}'", key))?;
        Ok(row_option.map(|(value,)| value))
    }

    async fn erase_all(&self) -> Result<()> {
        let query_string = format!("DELETE FROM {}", STATE_TABLE);

        sqlx::query(&query_string)
            .execute(&self.pool)
            .await
            .wrap_err("SqliteState: Failed to clear global_state table")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateStore for SqliteState {
    async fn set_bytes(&self, key: String, value: Vec<u8>) -> Result<()> {
        self.write_bytes(key, value).await
    }

    async fn get_bytes(&self, key: String) -> Result<Option<Vec<u8>>> {
        self.read_bytes(key).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.erase_all().await
    }
}
