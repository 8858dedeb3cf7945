//! Record storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{Collection, RecordStore, StoredRecord},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed record store
///
/// Each collection maps to one table keyed by record id. The connection
/// pool is opened and the tables are created on first use, so constructing
/// the store never touches the disk.
pub struct SqliteRecordStore {
    location: Location,
    pool: OnceCell<SqlitePool>,
}

impl SqliteRecordStore {
    /// Create a store backed by the given database file.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            location: Location::File(db_path),
            pool: OnceCell::new(),
        }
    }

    /// Create a store under the platform data directory, named after `namespace`.
    pub fn in_data_dir(namespace: &str) -> Result<Self> {
        let base = dirs::data_dir().ok_or_else(|| {
            BridgeError::NotAvailable("platform data directory".to_string())
        })?;
        Ok(Self::new(base.join("sheetstand").join(format!("{}.db", namespace))))
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            pool: OnceCell::new(),
        }
    }

    /// Database file, if the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<SqlitePool> {
        let (options, max_connections) = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(BridgeError::Io)?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal);
                (options, 4)
            }
            // Every connection to `:memory:` is its own database.
            Location::Memory => (SqliteConnectOptions::new().in_memory(true), 1),
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

        for collection in Collection::ALL {
            let statement = format!(
                r#"
                CREATE TABLE IF NOT EXISTS "{}" (
                    id TEXT PRIMARY KEY,
                    schema_version INTEGER NOT NULL,
                    data TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
                collection.name()
            );
            sqlx::query(&statement)
                .execute(&pool)
                .await
                .map_err(|e| {
                    BridgeError::DatabaseError(format!(
                        "Failed to create table {}: {}",
                        collection, e
                    ))
                })?;
        }

        info!(location = ?self.location, "Initialized record store");
        Ok(pool)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn initialize(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn put(&self, collection: Collection, record: StoredRecord) -> Result<()> {
        let pool = self.pool().await?;
        let statement = format!(
            r#"
            INSERT INTO "{}" (id, schema_version, data, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                schema_version = excluded.schema_version,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
            collection.name()
        );

        sqlx::query(&statement)
            .bind(&record.id)
            .bind(i64::from(record.schema_version))
            .bind(&record.data)
            .bind(Self::now())
            .execute(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to put record: {}", e)))?;

        debug!(collection = %collection, id = %record.id, "Stored record");
        Ok(())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        let pool = self.pool().await?;
        let statement = format!(
            r#"SELECT id, schema_version, data FROM "{}" ORDER BY id"#,
            collection.name()
        );

        let rows = sqlx::query(&statement)
            .fetch_all(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to read records: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let schema_version: i64 = row.try_get("schema_version").map_err(decode_error)?;
                let schema_version = u32::try_from(schema_version).map_err(|_| {
                    BridgeError::DatabaseError(format!(
                        "Invalid schema version {} in {}",
                        schema_version, collection
                    ))
                })?;
                Ok(StoredRecord {
                    id: row.try_get("id").map_err(decode_error)?,
                    schema_version,
                    data: row.try_get("data").map_err(decode_error)?,
                })
            })
            .collect()
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let pool = self.pool().await?;
        let statement = format!(r#"DELETE FROM "{}" WHERE id = ?"#, collection.name());

        sqlx::query(&statement)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to delete record: {}", e)))?;

        debug!(collection = %collection, id = id, "Deleted record");
        Ok(())
    }
}

fn decode_error(e: sqlx::Error) -> BridgeError {
    BridgeError::DatabaseError(format!("Failed to decode record: {}", e))
}
