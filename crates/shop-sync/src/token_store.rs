//! # Token Store
//!
//! Persists the session credential and the cached profile as two key-value
//! entries, `auth_token` and `current_user`.
//!
//! ```text
//! ┌──────────────────────────┐       ┌─────────────────────────────────┐
//! │ TokenStore               │       │ SessionStorage                  │
//! │                          │       │                                 │
//! │ save(token, profile) ────┼──────►│ put_all([token, profile])       │
//! │ load() ──────────────────┼──────►│ get(token), get(profile)        │
//! │ clear() ─────────────────┼──────►│ remove_all([token, profile])    │
//! └──────────────────────────┘       └──────────────┬──────────────────┘
//!                                                   │
//!                                   ┌───────────────┴───────────────┐
//!                                   ▼                               ▼
//!                            MemoryStorage                   SqliteStorage
//!                            (tests, --storage memory)       (shop-db kv_store)
//! ```
//!
//! Both entries are written together and removed together, so a reader never
//! observes a token without its profile.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use shop_core::{Token, UserProfile};
use shop_db::Database;

use crate::error::ClientResult;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the JSON-serialized profile.
pub const USER_KEY: &str = "current_user";

// =============================================================================
// Storage Trait
// =============================================================================

/// Durable string key-value storage.
///
/// `put_all` and `remove_all` must be all-or-nothing.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;

    async fn put_all(&self, entries: &[(&str, &str)]) -> ClientResult<()>;

    async fn remove_all(&self, keys: &[&str]) -> ClientResult<()>;
}

/// In-process storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put_all(&self, entries: &[(&str, &str)]) -> ClientResult<()> {
        let mut map = self.entries.write().await;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> ClientResult<()> {
        let mut map = self.entries.write().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage backed by the SQLite `kv_store` table.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        SqliteStorage { db }
    }
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.db.kv().get(key).await?)
    }

    async fn put_all(&self, entries: &[(&str, &str)]) -> ClientResult<()> {
        Ok(self.db.kv().put_many(entries).await?)
    }

    async fn remove_all(&self, keys: &[&str]) -> ClientResult<()> {
        self.db.kv().delete_many(keys).await?;
        Ok(())
    }
}

// =============================================================================
// Token Store
// =============================================================================

/// Owns the persisted session. Cheap to clone.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        TokenStore { storage }
    }

    /// A store backed by [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Writes token and profile in one step.
    pub async fn save(&self, token: &Token, user: &UserProfile) -> ClientResult<()> {
        let profile = serde_json::to_string(user)?;
        self.storage
            .put_all(&[(TOKEN_KEY, token.as_str()), (USER_KEY, profile.as_str())])
            .await?;

        debug!(user_id = user.id, "Persisted session");
        Ok(())
    }

    /// Reads the persisted session.
    ///
    /// `None` unless both entries exist. A profile that no longer parses is
    /// treated as absent and both entries are removed.
    pub async fn load(&self) -> ClientResult<Option<(Token, UserProfile)>> {
        let token = self.storage.get(TOKEN_KEY).await?;
        let profile = self.storage.get(USER_KEY).await?;

        let (Some(token), Some(profile)) = (token, profile) else {
            return Ok(None);
        };

        match serde_json::from_str::<UserProfile>(&profile) {
            Ok(user) => Ok(Some((Token::new(token), user))),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted profile");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// The persisted token alone.
    pub async fn token(&self) -> ClientResult<Option<Token>> {
        Ok(self.storage.get(TOKEN_KEY).await?.map(Token::new))
    }

    /// Removes both entries. Idempotent.
    pub async fn clear(&self) -> ClientResult<()> {
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY]).await?;
        debug!("Cleared persisted session");
        Ok(())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
