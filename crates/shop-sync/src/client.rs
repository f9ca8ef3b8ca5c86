//! # Shop Client
//!
//! Wires configuration, storage, gateways, [`SessionManager`] and
//! [`CartStore`] into one component with an explicit lifecycle.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ShopClientBuilder::new(config)                                        │
//! │      .with_storage(..)          ← required                             │
//! │      .with_auth_gateway(..)     ← default: HttpGateway                 │
//! │      .with_cart_gateway(..)     ← default: HttpGateway                 │
//! │      .with_navigator(..)        ← default: NoOpNavigator               │
//! │      .build()                                                          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  start()                                                               │
//! │    1. spawn cart session listener                                      │
//! │    2. restore persisted session (validation runs in background)        │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  session() / cart() used by the shell                                  │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  shutdown()                                                            │
//! │    stops the listener and any unfinished validation                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shop_db::{Database, DbConfig};

use crate::cart::{CartListenerHandle, CartStore};
use crate::config::{ClientConfig, StorageBackend};
use crate::error::{ClientError, ClientResult};
use crate::gateway::{AuthGateway, CartGateway, HttpGateway};
use crate::session::{Navigator, NoOpNavigator, SessionManager};
use crate::token_store::{MemoryStorage, SessionStorage, SqliteStorage, TokenStore};

/// Opens the session storage selected by `config.storage.backend`.
pub async fn open_storage(config: &ClientConfig) -> ClientResult<Arc<dyn SessionStorage>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            debug!("Using in-memory session storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Sqlite => {
            let path = config.database_path();
            let db = Database::new(DbConfig::new(path)).await?;
            Ok(Arc::new(SqliteStorage::new(db)))
        }
    }
}

// =============================================================================
// Shop Client
// =============================================================================

/// Session and cart engine with its background tasks.
pub struct ShopClient {
    config: Arc<ClientConfig>,
    session: SessionManager,
    cart: CartStore,
    listener: Option<CartListenerHandle>,
    validation: Option<JoinHandle<()>>,
}

impl ShopClient {
    pub fn builder(config: ClientConfig) -> ShopClientBuilder {
        ShopClientBuilder::new(config)
    }

    /// Builds a client with HTTP gateways and the configured storage.
    pub async fn from_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let storage = open_storage(&config).await?;
        ShopClientBuilder::new(config).with_storage(storage).build()
    }

    /// Starts following the session and restores any persisted login.
    pub async fn start(&mut self) -> ClientResult<()> {
        if self.listener.is_some() {
            debug!("Shop client already started");
            return Ok(());
        }

        info!(
            base_url = %self.config.base_url(),
            storage = %self.config.storage.backend,
            "Starting shop client"
        );

        self.listener = Some(self.cart.spawn_session_listener());
        self.validation = self.session.restore_on_startup().await?;

        info!(
            authenticated = self.session.is_authenticated(),
            "Shop client started"
        );
        Ok(())
    }

    /// Waits for background validation of a restored session, if any.
    pub async fn wait_for_validation(&mut self) {
        if let Some(task) = self.validation.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session validation task ended abnormally");
            }
        }
    }

    /// Stops background work.
    pub async fn shutdown(&mut self) {
        info!("Shutting down shop client");

        if let Some(task) = self.validation.take() {
            task.abort();
        }

        if let Some(listener) = self.listener.take() {
            listener.shutdown().await;
        }

        info!("Shop client stopped");
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.listener
            .as_ref()
            .map(|l| !l.is_finished())
            .unwrap_or(false)
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`ShopClient`].
pub struct ShopClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn SessionStorage>>,
    auth_gateway: Option<Arc<dyn AuthGateway>>,
    cart_gateway: Option<Arc<dyn CartGateway>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ShopClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        ShopClientBuilder {
            config,
            storage: None,
            auth_gateway: None,
            cart_gateway: None,
            navigator: None,
        }
    }

    /// Sets where the session is persisted.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_auth_gateway(mut self, gateway: Arc<dyn AuthGateway>) -> Self {
        self.auth_gateway = Some(gateway);
        self
    }

    pub fn with_cart_gateway(mut self, gateway: Arc<dyn CartGateway>) -> Self {
        self.cart_gateway = Some(gateway);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds the client. Missing gateways default to [`HttpGateway`].
    pub fn build(self) -> ClientResult<ShopClient> {
        let storage = self
            .storage
            .ok_or_else(|| ClientError::InvalidConfig("Session storage required".into()))?;

        let (auth_gateway, cart_gateway) = match (self.auth_gateway, self.cart_gateway) {
            (Some(auth), Some(cart)) => (auth, cart),
            (auth, cart) => {
                let http = Arc::new(HttpGateway::new(&self.config)?);
                (
                    auth.unwrap_or_else(|| http.clone()),
                    cart.unwrap_or_else(|| http.clone()),
                )
            }
        };

        let navigator = self.navigator.unwrap_or_else(|| Arc::new(NoOpNavigator));

        let session = SessionManager::new(
            auth_gateway,
            TokenStore::new(storage),
            navigator,
            self.config.auth.clone(),
        );
        let cart = CartStore::new(cart_gateway, session.clone());

        Ok(ShopClient {
            config: Arc::new(self.config),
            session,
            cart,
            listener: None,
            validation: None,
        })
    }
}
