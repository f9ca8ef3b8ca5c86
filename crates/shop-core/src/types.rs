//! # Domain Types
//!
//! Core domain types shared by the session and cart engines.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Session      │   │   CartLine      │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user?          │   │  id? (server)   │   │  id             │       │
//! │  │  credential?    │──►│  product ───────┼──►│  code, name     │       │
//! │  │  authenticated  │   │  quantity ≥ 1   │   │  price          │       │
//! │  └────────┬────────┘   │  total_price    │   │  inventory...   │       │
//! │           │            └─────────────────┘   └─────────────────┘       │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  UserProfile    │   │     Token       │   │  Credentials    │       │
//! │  │  id, username   │   │  opaque bearer  │   │  NewAccount     │       │
//! │  │  firstname      │   │  (JWT, redacted │   │  (request       │       │
//! │  │  email          │   │   in Debug)     │   │   payloads)     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Field names follow the shop API (`camelCase`). Money travels as JSON
//! decimals and timestamps as epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{self, Money};

// =============================================================================
// User Profile
// =============================================================================

/// The signed-in user, as cached alongside the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub email: String,
}

// =============================================================================
// Product
// =============================================================================

/// Stock level bucket reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum InventoryStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl InventoryStatus {
    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            InventoryStatus::InStock => "In Stock",
            InventoryStatus::LowStock => "Low Stock",
            InventoryStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A catalog product as embedded in cart lines.
///
/// The catalog itself lives elsewhere; the cart only needs identity and
/// price, so everything else is optional and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Unit price.
    #[serde(with = "money::decimal")]
    #[ts(type = "number")]
    pub price: Money,

    /// Units in stock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_status: Option<InventoryStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    #[ts(type = "number | null")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    #[ts(type = "number | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Creates a product with just the fields the cart cares about.
    pub fn new(id: i64, code: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Product {
            id,
            code: code.into(),
            name: name.into(),
            description: None,
            image: None,
            category: None,
            price,
            quantity: None,
            internal_reference: None,
            shell_id: None,
            inventory_status: None,
            rating: None,
            created_at: None,
            updated_at: None,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product entry in a cart.
///
/// ## Lifecycle
/// ```text
/// add_local()              →  CartLine { id: None, .. }      (client only)
/// server add / load        →  CartLine { id: Some(42), .. }  (server owned)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Server identity. `None` while the line only exists locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub product: Product,

    /// Always ≥ 1 once committed to a snapshot.
    pub quantity: i64,

    #[serde(with = "money::decimal")]
    #[ts(type = "number")]
    pub total_price: Money,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    #[ts(type = "number | null")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    #[ts(type = "number | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartLine {
    /// Creates a client-only line priced from the product's unit price.
    pub fn local(product: Product, quantity: i64) -> Self {
        let total_price = product.price.multiply_quantity(quantity);
        CartLine {
            id: None,
            product,
            quantity,
            total_price,
            created_at: None,
            updated_at: None,
        }
    }

    /// Identity of the product this line holds.
    #[inline]
    pub fn product_id(&self) -> i64 {
        self.product.id
    }
}

// =============================================================================
// Request Payloads
// =============================================================================

/// Login payload for the token exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account creation payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub firstname: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    /// The credentials used for the automatic login after registration.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("firstname", &self.firstname)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Token
// =============================================================================

/// Opaque bearer credential.
///
/// Passed around by value only. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Token(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} bytes>)", self.0.len())
    }
}

// =============================================================================
// Session
// =============================================================================

/// Authentication state of the current user.
///
/// ## Invariant
/// `is_authenticated()` holds iff both a user and a credential are present.
/// Fields are private so the only way to build an authenticated session is
/// [`Session::authenticated`], which requires both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    user: Option<UserProfile>,
    credential: Option<Token>,
    authenticated: bool,
}

impl Session {
    /// The empty session: no user, no credential.
    pub fn anonymous() -> Self {
        Session::default()
    }

    /// A signed-in session.
    pub fn authenticated(user: UserProfile, credential: Token) -> Self {
        Session {
            user: Some(user),
            credential: Some(credential),
            authenticated: true,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn credential(&self) -> Option<&Token> {
        self.credential.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none() && self.credential.is_none() && !self.authenticated
    }

    /// Id of the signed-in user, if any.
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: 7,
            username: "jdoe".to_string(),
            firstname: "John".to_string(),
            email: "john@example.com".to_string(),
        }
    }

    #[test]
    fn test_session_invariant() {
        let anon = Session::anonymous();
        assert!(anon.is_anonymous());
        assert!(!anon.is_authenticated());
        assert!(anon.user().is_none());
        assert!(anon.credential().is_none());

        let session = Session::authenticated(profile(), Token::new("abc"));
        assert!(session.is_authenticated());
        assert!(!session.is_anonymous());
        assert_eq!(session.user_id(), Some(7));
        assert_eq!(session.credential().map(Token::as_str), Some("abc"));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let token = Token::new("eyJhbGciOiJIUzUxMiJ9.secret.sig");
        assert!(!format!("{:?}", token).contains("secret"));

        let creds = Credentials::new("a@b.c", "hunter22");
        assert!(!format!("{:?}", creds).contains("hunter22"));
    }

    #[test]
    fn test_cart_line_wire_format() {
        let json = r#"{
            "id": 3,
            "product": {
                "id": 1000,
                "code": "f230fh0g3",
                "name": "Bamboo Watch",
                "price": 65.5,
                "inventoryStatus": "INSTOCK",
                "createdAt": 1718000000000
            },
            "quantity": 2,
            "totalPrice": 131.0,
            "createdAt": 1718000000000
        }"#;

        let line: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.id, Some(3));
        assert_eq!(line.product_id(), 1000);
        assert_eq!(line.product.price, Money::from_cents(6550));
        assert_eq!(line.product.inventory_status, Some(InventoryStatus::InStock));
        assert_eq!(line.total_price, Money::from_cents(13100));
        assert_eq!(
            line.created_at.map(|t| t.timestamp_millis()),
            Some(1_718_000_000_000)
        );
        assert_eq!(line.updated_at, None);
    }

    #[test]
    fn test_local_line_prices_from_unit_price() {
        let product = Product::new(1, "P1", "Widget", Money::from_cents(1000));
        let line = CartLine::local(product, 3);
        assert_eq!(line.id, None);
        assert_eq!(line.total_price, Money::from_cents(3000));
    }

    #[test]
    fn test_profile_round_trips_for_persistence() {
        let json = serde_json::to_string(&profile()).unwrap();
        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile());
    }
}
