//! # shop-core: Pure Domain Logic for the Shop Client
//!
//! This crate holds the domain model of the shop client: who is signed in,
//! what is in the cart, and how cart totals are derived. Everything here is
//! a pure function over plain data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shop Client Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI collaborators (CLI, web views)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │      shop-sync: SessionManager, CartStore, HTTP gateway         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shop-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Session  │  │   Money   │  │ Snapshot  │  │   rules   │  │   │
//! │  │   │  Product  │  │  decimal  │  │ fold/merge│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (UserProfile, Product, CartLine, Session, Token)
//! - [`money`] - Money type with integer arithmetic and a decimal wire codec
//! - [`cart`] - Cart snapshot with derived totals
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use shop_core::{CartSnapshot, Money, Product};
//!
//! let product = Product::new(1, "P-1", "Bamboo Watch", Money::from_cents(1000));
//! let mut cart = CartSnapshot::empty();
//!
//! cart.add_local(&product, 2).unwrap();
//! cart.add_local(&product, 3).unwrap();
//!
//! assert_eq!(cart.lines().len(), 1);
//! assert_eq!(cart.total_items(), 5);
//! assert_eq!(cart.total_amount(), Money::from_cents(5000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::CartSnapshot;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

