//! # Cart Snapshot
//!
//! The complete state of a cart at one instant: ordered lines plus the two
//! derived totals.
//!
//! ## Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CartSnapshot Invariants                              │
//! │                                                                         │
//! │  1. total_items  == Σ line.quantity                                     │
//! │  2. total_amount == Σ line.total_price                                  │
//! │  3. at most one line per product id                                     │
//! │                                                                         │
//! │  Every mutator below ends with recompute(). Totals are private and      │
//! │  have no setters, so (1) and (2) cannot drift.                          │
//! │                                                                         │
//! │  Remote flavour (server confirmed)     Local flavour (client only)      │
//! │  ─────────────────────────────────     ───────────────────────────      │
//! │  merge_remote_line(line, qty)          add_local(product, qty)          │
//! │  replace_line(line)                    update_local(product_id, qty)    │
//! │  remove_line(line_id)                  remove_local(product_id)         │
//! │                         clear()                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartLine, Product};
use crate::validation::validate_quantity;

/// Ordered cart lines with derived totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
    total_items: i64,
    total_amount: Money,
}

impl CartSnapshot {
    /// The empty cart: `{ lines: [], total_items: 0, total_amount: 0 }`.
    pub fn empty() -> Self {
        CartSnapshot::default()
    }

    /// Builds a snapshot from server lines, recomputing the totals.
    ///
    /// Duplicate product entries are folded into the first occurrence so the
    /// one-line-per-product invariant holds even for a misbehaving server.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = CartSnapshot::empty();
        for line in lines {
            match snapshot.position_of_product(line.product_id()) {
                Some(idx) => {
                    let existing = &mut snapshot.lines[idx];
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                    existing.total_price += line.total_price;
                }
                None => snapshot.lines.push(line),
            }
        }
        snapshot.recompute();
        snapshot
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of all line quantities.
    pub fn total_items(&self) -> i64 {
        self.total_items
    }

    /// Sum of all line totals.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Finds the line holding a product.
    pub fn line_for_product(&self, product_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    /// Finds a line by its server identity.
    pub fn line(&self, line_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == Some(line_id))
    }

    // =========================================================================
    // Remote Mutators (apply a server-confirmed change)
    // =========================================================================

    /// Merges the line the server returned for an add request.
    ///
    /// ## Merge Rule
    /// ```text
    /// existing line for product?
    ///   yes → quantity    += requested_quantity
    ///         total_price += returned.total_price
    ///   no  → append returned line as-is
    /// ```
    ///
    /// Each concurrent add contributes its own delta, so the outcome does not
    /// depend on the order the responses arrive in.
    pub fn merge_remote_line(&mut self, returned: CartLine, requested_quantity: i64) {
        match self.position_of_product(returned.product_id()) {
            Some(idx) => {
                let existing = &mut self.lines[idx];
                existing.quantity = existing.quantity.saturating_add(requested_quantity);
                existing.total_price += returned.total_price;
                if existing.id.is_none() {
                    existing.id = returned.id;
                }
                if returned.updated_at.is_some() {
                    existing.updated_at = returned.updated_at;
                }
            }
            None => self.lines.push(returned),
        }
        self.recompute();
    }

    /// Replaces the line with the same server id.
    ///
    /// A returned quantity ≤ 0 means the server dropped the line, so it is
    /// removed. Returns `false` when no line has that id.
    pub fn replace_line(&mut self, updated: CartLine) -> bool {
        let Some(line_id) = updated.id else {
            return false;
        };
        let Some(idx) = self.lines.iter().position(|l| l.id == Some(line_id)) else {
            return false;
        };

        if updated.quantity <= 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx] = updated;
        }
        self.recompute();
        true
    }

    /// Removes the line with the given server id.
    pub fn remove_line(&mut self, line_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != Some(line_id));
        let removed = self.lines.len() != before;
        self.recompute();
        removed
    }

    // =========================================================================
    // Local Mutators (client-authoritative)
    // =========================================================================

    /// Adds a product, or grows the existing line for it.
    ///
    /// The line total is re-priced from the unit price: `price × quantity`.
    pub fn add_local(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(idx) = self.position_of_product(product.id) {
            let line = &mut self.lines[idx];
            line.quantity = line.quantity.saturating_add(quantity);
            line.total_price = line.product.price.multiply_quantity(line.quantity);
        } else {
            self.lines.push(CartLine::local(product.clone(), quantity));
        }

        self.recompute();
        Ok(())
    }

    /// Sets the quantity of a product's line; `quantity <= 0` removes it.
    pub fn update_local(&mut self, product_id: i64, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_local(product_id);
            return Ok(());
        }

        let idx = self
            .position_of_product(product_id)
            .ok_or(CoreError::LineNotFound(product_id))?;
        let line = &mut self.lines[idx];
        line.quantity = quantity;
        line.total_price = line.product.price.multiply_quantity(quantity);

        self.recompute();
        Ok(())
    }

    /// Removes a product's line. Returns whether anything was removed.
    pub fn remove_local(&mut self, product_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id() != product_id);
        let removed = self.lines.len() != before;
        self.recompute();
        removed
    }

    /// Drops every line.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recompute();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position_of_product(&self, product_id: i64) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id() == product_id)
    }

    fn recompute(&mut self) {
        self.total_items = self
            .lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity));
        self.total_amount = self.lines.iter().map(|l| l.total_price).sum();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: i64, price_cents: i64) -> Product {
        Product::new(id, format!("P-{}", id), format!("Product {}", id), Money::from_cents(price_cents))
    }

    fn server_line(line_id: i64, product: &Product, quantity: i64) -> CartLine {
        CartLine {
            id: Some(line_id),
            ..CartLine::local(product.clone(), quantity)
        }
    }

    fn assert_totals_are_folds(cart: &CartSnapshot) {
        let items: i64 = cart.lines().iter().map(|l| l.quantity).sum();
        let amount: Money = cart.lines().iter().map(|l| l.total_price).sum();
        assert_eq!(cart.total_items(), items);
        assert_eq!(cart.total_amount(), amount);
    }

    #[test]
    fn test_add_local_twice_merges_into_one_line() {
        let mut cart = CartSnapshot::empty();
        let product = test_product(1, 1000);

        cart.add_local(&product, 2).unwrap();
        cart.add_local(&product, 3).unwrap();

        assert_eq!(cart.len(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.quantity, 5);
        assert_eq!(line.total_price, Money::from_cents(5000));
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_amount(), Money::from_cents(5000));
    }

    #[test]
    fn test_add_local_rejects_non_positive_quantity() {
        let mut cart = CartSnapshot::empty();
        let product = test_product(1, 1000);

        assert!(matches!(
            cart.add_local(&product, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_local_has_no_quantity_or_line_cap() {
        let mut cart = CartSnapshot::empty();
        let product = test_product(1, 100);

        cart.add_local(&product, 600).unwrap();
        cart.add_local(&product, 600).unwrap();
        assert_eq!(cart.line_for_product(1).unwrap().quantity, 1200);
        assert_eq!(cart.total_amount(), Money::from_cents(120_000));

        cart.update_local(1, 5000).unwrap();
        assert_eq!(cart.total_items(), 5000);

        for id in 2..=150 {
            cart.add_local(&test_product(id, 100), 1).unwrap();
        }
        assert_eq!(cart.len(), 150);
        assert_eq!(cart.total_items(), 5149);
        assert_totals_are_folds(&cart);
    }

    #[test]
    fn test_extreme_server_amounts_saturate() {
        let product = test_product(1, i64::MAX / 2);
        let cart = CartSnapshot::from_lines(vec![
            server_line(10, &product, 2),
            server_line(11, &test_product(2, i64::MAX), 1),
        ]);

        assert_eq!(cart.total_amount(), Money::from_cents(i64::MAX));
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_update_local_reprices_and_removes() {
        let mut cart = CartSnapshot::empty();
        let a = test_product(1, 250);
        let b = test_product(2, 1000);
        cart.add_local(&a, 1).unwrap();
        cart.add_local(&b, 1).unwrap();

        cart.update_local(1, 4).unwrap();
        assert_eq!(cart.line_for_product(1).unwrap().total_price, Money::from_cents(1000));
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_amount(), Money::from_cents(2000));

        cart.update_local(2, 0).unwrap();
        assert!(cart.line_for_product(2).is_none());
        cart.update_local(1, -1).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount(), Money::zero());
    }

    #[test]
    fn test_update_local_missing_line() {
        let mut cart = CartSnapshot::empty();
        assert!(matches!(
            cart.update_local(9, 2),
            Err(CoreError::LineNotFound(9))
        ));
        // Removal of a missing line is a no-op.
        assert!(cart.update_local(9, 0).is_ok());
    }

    #[test]
    fn test_remove_local() {
        let mut cart = CartSnapshot::empty();
        cart.add_local(&test_product(1, 100), 2).unwrap();

        assert!(!cart.remove_local(2));
        assert!(cart.remove_local(1));
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_merge_remote_line_sums_requested_quantity_and_returned_total() {
        let product = test_product(1, 1000);
        let mut cart = CartSnapshot::from_lines(vec![server_line(10, &product, 2)]);

        // Server returns the priced delta for the 3 units just added.
        cart.merge_remote_line(server_line(10, &product, 3), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.lines()[0].total_price, Money::from_cents(5000));
        assert_totals_are_folds(&cart);
    }

    #[test]
    fn test_merge_remote_line_appends_new_product() {
        let mut cart = CartSnapshot::empty();
        cart.merge_remote_line(server_line(10, &test_product(1, 1000), 1), 1);
        cart.merge_remote_line(server_line(11, &test_product(2, 500), 2), 2);

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_amount(), Money::from_cents(2000));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let product = test_product(1, 100);
        let adds = [(1, 1), (2, 4), (3, 2)];

        let mut forward = CartSnapshot::empty();
        for (id, q) in adds {
            forward.merge_remote_line(server_line(id, &product, q), q);
        }
        let mut backward = CartSnapshot::empty();
        for (id, q) in adds.iter().rev().copied() {
            backward.merge_remote_line(server_line(id, &product, q), q);
        }

        assert_eq!(forward.total_items(), 7);
        assert_eq!(forward.total_items(), backward.total_items());
        assert_eq!(forward.total_amount(), backward.total_amount());
    }

    #[test]
    fn test_replace_line_by_identity() {
        let a = test_product(1, 100);
        let b = test_product(2, 200);
        let mut cart =
            CartSnapshot::from_lines(vec![server_line(10, &a, 1), server_line(11, &b, 1)]);

        assert!(cart.replace_line(server_line(11, &b, 5)));
        assert_eq!(cart.line(11).unwrap().quantity, 5);
        assert_eq!(cart.total_items(), 6);
        assert_eq!(cart.total_amount(), Money::from_cents(1100));

        assert!(!cart.replace_line(server_line(99, &b, 5)));
        assert!(!cart.replace_line(CartLine::local(b.clone(), 1)));
    }

    #[test]
    fn test_replace_line_with_zero_quantity_drops_it() {
        let a = test_product(1, 100);
        let mut cart = CartSnapshot::from_lines(vec![server_line(10, &a, 3)]);

        let mut dropped = server_line(10, &a, 0);
        dropped.total_price = Money::zero();
        assert!(cart.replace_line(dropped));
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_remove_line() {
        let a = test_product(1, 100);
        let mut cart = CartSnapshot::from_lines(vec![server_line(10, &a, 3)]);

        assert!(!cart.remove_line(11));
        assert!(cart.remove_line(10));
        assert_eq!(cart, CartSnapshot::empty());
    }

    #[test]
    fn test_from_lines_folds_duplicates() {
        let a = test_product(1, 100);
        let cart = CartSnapshot::from_lines(vec![
            server_line(10, &a, 1),
            server_line(12, &a, 2),
        ]);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_amount(), Money::from_cents(300));
    }

    #[test]
    fn test_clear() {
        let mut cart = CartSnapshot::empty();
        cart.add_local(&test_product(1, 999), 2).unwrap();
        assert!(!cart.is_empty());

        cart.clear();
        assert_eq!(cart, CartSnapshot::empty());
    }

    #[test]
    fn test_snapshot_serializes_for_ui() {
        let mut cart = CartSnapshot::empty();
        cart.add_local(&test_product(1, 1000), 2).unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["totalItems"], 2);
        assert_eq!(json["lines"][0]["totalPrice"], serde_json::json!(20.0));
    }
}
