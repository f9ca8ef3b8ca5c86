//! # Session Database
//!
//! Opens the client's SQLite file and hands out repositories.
//!
//! ```text
//! DbConfig::new(path) / DbConfig::in_memory()
//!        │
//!        ▼
//! Database::new(config) ── mkdir -p parent ── open (WAL, busy timeout) ── migrate
//!        │
//!        ▼
//! db.kv() ──► KeyValueRepository ──► kv_store
//! ```
//!
//! Several CLI invocations may touch the same file at once. WAL keeps readers
//! unblocked and the busy timeout makes a second writer wait instead of
//! failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::kv::KeyValueRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Private to one connection; gone when the pool closes.
    Memory,
}

/// How to open the session database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: Location,

    /// Default: 4. Forced to 1 for [`Location::Memory`].
    pub max_connections: u32,

    /// How long to wait for a pooled connection. Default: 10 seconds.
    pub acquire_timeout: Duration,

    /// How long a writer waits on a locked file. Default: 5 seconds.
    pub busy_timeout: Duration,

    /// Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file-backed database. The file and its parent directory are created
    /// on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: Location::File(path.into()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A throwaway database for tests and `--storage memory`.
    pub fn in_memory() -> Self {
        DbConfig {
            location: Location::Memory,
            max_connections: 1,
            ..Self::new(PathBuf::new())
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            Location::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            Location::Memory => SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .foreign_keys(true)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the session database. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool_options = match &config.location {
            Location::File(path) => {
                info!(path = %path.display(), "Opening session database");
                ensure_parent_dir(path).await?;
                SqlitePoolOptions::new().max_connections(config.max_connections)
            }
            Location::Memory => {
                debug!("Opening in-memory session database");
                // Every new connection would see an empty database, so the
                // single connection must never be recycled.
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            }
        };

        let pool = pool_options
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository over the `kv_store` table.
    pub fn kv(&self) -> KeyValueRepository {
        KeyValueRepository::new(self.pool.clone())
    }

    /// Closes every connection. Later queries fail with a pool error.
    pub async fn close(&self) {
        debug!("Closing session database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

async fn ensure_parent_dir(path: &Path) -> DbResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| {
                DbError::ConnectionFailed(format!("cannot create {}: {e}", parent.display()))
            }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("shop-db-{}-{name}", std::process::id()))
            .join("session.db")
    }

    #[tokio::test]
    async fn test_in_memory_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_in_memory_keeps_data_between_queries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.kv().put_many(&[("k", "v")]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(db.kv().get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let path = scratch_path("reopen");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.kv().put_many(&[("auth_token", "abc")]).await.unwrap();
        db.close().await;

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(
            db.kv().get("auth_token").await.unwrap().as_deref(),
            Some("abc")
        );
        db.close().await;

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/session.db")
            .max_connections(8)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.location, Location::File("/tmp/session.db".into()));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);

        assert_eq!(DbConfig::in_memory().location, Location::Memory);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(!db.health_check().await);
    }
}
