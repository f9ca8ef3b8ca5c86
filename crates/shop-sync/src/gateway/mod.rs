//! # Gateways
//!
//! Seams between the engine and the shop API. [`SessionManager`] talks to an
//! [`AuthGateway`]; [`CartStore`] talks to a [`CartGateway`]. Production uses
//! [`HttpGateway`] for both; tests substitute in-memory fakes.
//!
//! ## Endpoints
//! ```text
//! AuthGateway
//!   exchange_token   POST   /api/auth/token          {email, password}
//!   create_account   POST   /api/auth/account        {username, firstname, email, password}
//!   probe            GET    <probe_path>             Bearer
//!
//! CartGateway (all Bearer)
//!   fetch_cart       GET    /api/cart
//!   add_line         POST   /api/cart/add/{productId}?quantity=N
//!   update_line      PUT    /api/cart/{lineId}?quantity=N
//!   remove_line      DELETE /api/cart/{lineId}
//!   clear            DELETE /api/cart/clear
//! ```
//!
//! [`SessionManager`]: crate::session::SessionManager
//! [`CartStore`]: crate::cart::CartStore

pub mod http;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use shop_core::{CartLine, Credentials, Money, NewAccount, Token, UserProfile};

use crate::error::ClientResult;

pub use http::HttpGateway;

// =============================================================================
// Traits
// =============================================================================

/// Authentication endpoints.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges credentials for a bearer token and the user's profile.
    async fn exchange_token(&self, credentials: &Credentials) -> ClientResult<TokenResponse>;

    /// Creates an account. Does not sign in.
    async fn create_account(&self, account: &NewAccount) -> ClientResult<UserProfile>;

    /// Calls a protected endpoint. `Ok` means the token is still accepted.
    async fn probe(&self, token: &Token) -> ClientResult<()>;
}

/// Server-side cart endpoints.
#[async_trait]
pub trait CartGateway: Send + Sync {
    async fn fetch_cart(&self, token: &Token) -> ClientResult<CartResponse>;

    /// Returns the line as the server recorded this addition.
    async fn add_line(&self, token: &Token, product_id: i64, quantity: i64)
        -> ClientResult<CartLine>;

    /// `None` when the server answered with an empty body.
    async fn update_line(
        &self,
        token: &Token,
        line_id: i64,
        quantity: i64,
    ) -> ClientResult<Option<CartLine>>;

    async fn remove_line(&self, token: &Token, line_id: i64) -> ClientResult<()>;

    async fn clear(&self, token: &Token) -> ClientResult<()>;
}

// =============================================================================
// Wire Types
// =============================================================================

/// Body of a successful token exchange.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
    pub id: i64,
    pub email: String,
    pub username: String,
    pub firstname: String,
}

impl TokenResponse {
    /// Splits the response into the credential and the profile to cache.
    pub fn into_parts(self) -> (Token, UserProfile) {
        let profile = UserProfile {
            id: self.id,
            username: self.username,
            firstname: self.firstname,
            email: self.email,
        };
        (Token::new(self.token), profile)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("id", &self.id)
            .field("email", &self.email)
            .finish()
    }
}

/// Body of `GET /api/cart`. Every field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(default)]
    pub data: Option<Vec<CartLine>>,

    #[serde(default)]
    pub total_items: Option<i64>,

    #[serde(default, with = "shop_core::money::decimal::option")]
    pub total_amount: Option<Money>,
}

impl CartResponse {
    pub fn lines(self) -> Vec<CartLine> {
        self.data.unwrap_or_default()
    }
}

/// Error body sent with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub errors: Option<HashMap<String, String>>,
}

impl ApiErrorBody {
    /// The server message, or field errors joined when the message is empty.
    pub fn best_message(&self) -> Option<String> {
        match self.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => Some(m.to_string()),
            _ => self.errors.as_ref().filter(|e| !e.is_empty()).map(|errors| {
                let mut fields: Vec<_> = errors.iter().collect();
                fields.sort();
                fields
                    .into_iter()
                    .map(|(field, msg)| format!("{field}: {msg}"))
                    .collect::<Vec<_>>()
                    .join("; ")
            }),
        }
    }
}
