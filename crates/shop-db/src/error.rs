//! Errors raised by the session database.
//!
//! ```text
//! sqlx::Error / MigrateError ──► DbError ──► ClientError::Storage (shop-sync)
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The file could not be created or opened.
    #[error("Cannot open session database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed; nothing from the batch was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Another writer held the file past the busy timeout.
    #[error("Session database is locked by another process")]
    Locked,

    #[error("Timed out waiting for a database connection")]
    PoolExhausted,

    #[error("Session database is closed")]
    Closed,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True when retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Locked | DbError::PoolExhausted)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLITE_BUSY surfaces as "database is locked".
                if msg.contains("database is locked") {
                    DbError::Locked
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::Closed,
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
