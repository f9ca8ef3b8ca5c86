//! # shop-sync: Session and Cart Engine for the Shop Client
//!
//! This crate keeps the signed-in session and the shopping cart consistent
//! with the shop backend and publishes both as observable state.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shop Client Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     ShopClient (Orchestrator)                    │  │
//! │  │                                                                  │  │
//! │  │  Built from ClientConfig, owns the background tasks              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┴─────────────────────┐                  │
//! │         ▼                                           ▼                   │
//! │  ┌────────────────────┐  session changes   ┌────────────────────────┐  │
//! │  │  SessionManager    │ ─────────────────► │  CartStore             │  │
//! │  │                    │   (watch channel)  │                        │  │
//! │  │ login / register   │                    │ load on sign-in        │  │
//! │  │ logout / restore   │                    │ reset on sign-out      │  │
//! │  │ expiry, admin      │                    │ remote + local edits   │  │
//! │  └───┬───────────┬────┘                    └───────────┬────────────┘  │
//! │      │           │                                     │               │
//! │      ▼           ▼                                     ▼               │
//! │  ┌─────────┐ ┌──────────────┐              ┌──────────────────────┐   │
//! │  │TokenStore│ │ AuthGateway  │              │  CartGateway         │   │
//! │  │ memory / │ │              │              │                      │   │
//! │  │ sqlite   │ └──────┬───────┘              └──────────┬───────────┘   │
//! │  └─────────┘         └──────────────┬──────────────────┘               │
//! │                                     ▼                                   │
//! │                          HttpGateway (reqwest, JSON)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`client`] - `ShopClient` orchestrator and builder
//! - [`config`] - Client configuration (API, storage, admin identity)
//! - [`error`] - Client error types
//! - [`session`] - Authentication lifecycle
//! - [`cart`] - Cart state following the session
//! - [`credential`] - Unverified token claim decoding
//! - [`token_store`] - Persisted token and profile
//! - [`gateway`] - Backend traits, wire types and the HTTP implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shop_core::Credentials;
//! use shop_sync::{ClientConfig, ShopClient};
//!
//! let config = ClientConfig::load_or_default(None);
//! let mut client = ShopClient::from_config(config).await?;
//! client.start().await?;
//!
//! client.session().login(Credentials::new("jane@shop.test", "secret")).await?;
//! client.cart().add(42, 2).await?;
//! println!("{} items", client.cart().snapshot().total_items());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod session;
pub mod token_store;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{CartListenerHandle, CartMode, CartStore};
pub use client::{open_storage, ShopClient, ShopClientBuilder};
pub use config::{ApiSettings, AuthSettings, ClientConfig, StorageBackend, StorageSettings};
pub use credential::TokenClaims;
pub use error::{ClientError, ClientResult};
pub use gateway::{AuthGateway, CartGateway, CartResponse, HttpGateway, TokenResponse};
pub use session::{Navigator, NoOpNavigator, Route, SessionManager};
pub use token_store::{MemoryStorage, SessionStorage, SqliteStorage, TokenStore};
