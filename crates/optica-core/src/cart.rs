//! # Cart
//!
//! In-memory cart assembled during a single checkout session.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                  │
//! │                                                                     │
//! │  Operator Action            Operation             State Change      │
//! │  ───────────────            ─────────             ────────────      │
//! │                                                                     │
//! │  Click search result ─────► add_item() ─────────► merge or push     │
//! │                                                                     │
//! │  Change quantity ─────────► update_quantity() ──► qty = n, retotal  │
//! │                                                                     │
//! │  Enter line discount ─────► set_line_discount() ► bounded discount  │
//! │                                                                     │
//! │  Click remove ────────────► remove_item() ──────► line deleted      │
//! │                                                                     │
//! │  NOTE: mutations are synchronous and applied in the order issued;   │
//! │        nothing here is merged, reordered, or deferred.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by (kind, product id)
//! - Quantity is always >= 1; a quantity below 1 is rejected, not clamped
//! - Line discount never exceeds unit price × quantity
//! - Order discount never exceeds the subtotal
//! - `total() == subtotal() - total_discount()` after any sequence of ops

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{InvoiceItem, LineKey, Product};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A line in the cart.
///
/// ## Design Notes
/// - `key`: composite (kind, product id) identity for merge/update/remove
/// - Name and price are frozen copies of the product at the moment it was
///   added, so the cart stays consistent even if the catalog changes
///   mid-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Composite line identity.
    pub key: LineKey,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Quantity in cart (>= 1).
    pub quantity: i64,

    /// Per-line discount in cents (0 <= d <= unit price × quantity).
    pub discount_cents: i64,

    /// When this line was added to the cart.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new cart line from a product, quantity 1, no discount.
    pub fn from_product(product: &Product) -> Self {
        CartItem {
            key: product.line_key(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: 1,
            discount_cents: 0,
            added_at: Utc::now(),
        }
    }

    /// Line total: unit price × quantity − discount.
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity - self.discount_cents
    }

    /// Upper bound for this line's discount.
    fn gross_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Freezes this line into an invoice item snapshot.
    pub fn to_invoice_item(&self) -> InvoiceItem {
        InvoiceItem {
            item_kind: self.key.kind,
            item_id: self.key.product_id.clone(),
            description: self.name.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            discount_cents: self.discount_cents,
            total_cents: self.line_total_cents(),
        }
    }
}

/// The cart: transient line collection plus an order-level discount.
///
/// Exists only for the duration of a checkout session; cleared on checkout
/// success or session abandonment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cart {
    /// Lines in the cart, in the order they were first added.
    pub items: Vec<CartItem>,

    /// Order-level discount in cents, on top of per-line discounts.
    pub order_discount_cents: i64,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            order_discount_cents: 0,
        }
    }

    /// Adds a product to the cart, or bumps quantity if the same
    /// (kind, id) line is already present.
    ///
    /// No stock check happens here: stock shown in search results is
    /// informational and the server is the final arbiter at checkout.
    pub fn add_item(&mut self, product: &Product) -> Result<(), ValidationError> {
        if let Some(item) = self.items.iter_mut().find(|i| i.key == product.line_key()) {
            if item.quantity + 1 > MAX_ITEM_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity += 1;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "cart items".to_string(),
                min: 0,
                max: MAX_CART_ITEMS as i64,
            });
        }

        self.items.push(CartItem::from_product(product));
        Ok(())
    }

    /// Updates the quantity of a line.
    ///
    /// ## Behavior
    /// - Quantity below 1 is rejected; the line is left untouched
    /// - The line discount is preserved; if it now exceeds the new gross,
    ///   that is also a rejection (the operator must lower the discount
    ///   first rather than have it silently clamped)
    /// - Likewise a shrink that would leave the order discount above the
    ///   new subtotal is rejected
    /// - Unknown key is rejected
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) -> Result<(), ValidationError> {
        validate_quantity(quantity)?;

        let idx = self
            .items
            .iter()
            .position(|i| &i.key == key)
            .ok_or_else(|| ValidationError::Required {
                field: "cart line".to_string(),
            })?;

        let item = &self.items[idx];
        let new_gross = item.unit_price_cents * quantity;

        if item.discount_cents > new_gross {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: new_gross,
            });
        }

        let new_subtotal = self.subtotal_cents() - item.gross_cents() + new_gross;
        if self.order_discount_cents > new_subtotal {
            return Err(ValidationError::OutOfRange {
                field: "order discount".to_string(),
                min: 0,
                max: new_subtotal,
            });
        }

        self.items[idx].quantity = quantity;
        Ok(())
    }

    /// Sets the per-line discount.
    ///
    /// Bounded by 0 <= discount <= unit price × quantity; out-of-bounds
    /// values are rejected, never clamped.
    pub fn set_line_discount(
        &mut self,
        key: &LineKey,
        discount_cents: i64,
    ) -> Result<(), ValidationError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| &i.key == key)
            .ok_or_else(|| ValidationError::Required {
                field: "cart line".to_string(),
            })?;

        if discount_cents < 0 || discount_cents > item.gross_cents() {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: item.gross_cents(),
            });
        }

        item.discount_cents = discount_cents;
        Ok(())
    }

    /// Sets the order-level discount.
    ///
    /// An order discount exceeding the subtotal is a validation error, not
    /// silently clamped.
    pub fn set_order_discount(&mut self, discount_cents: i64) -> Result<(), ValidationError> {
        if discount_cents < 0 || discount_cents > self.subtotal_cents() {
            return Err(ValidationError::OutOfRange {
                field: "order discount".to_string(),
                min: 0,
                max: self.subtotal_cents(),
            });
        }

        self.order_discount_cents = discount_cents;
        Ok(())
    }

    /// Removes a line unconditionally. Removing an absent key is a no-op,
    /// so a double-clicked remove button never surfaces an error.
    ///
    /// If the shrunken subtotal no longer covers the order discount, the
    /// discount is re-bounded to the new subtotal: removal must always
    /// succeed, and the total must never go negative.
    pub fn remove_item(&mut self, key: &LineKey) {
        self.items.retain(|i| &i.key != key);

        let subtotal = self.subtotal_cents();
        if self.order_discount_cents > subtotal {
            self.order_discount_cents = subtotal;
        }
    }

    /// Clears all lines and the order discount.
    pub fn clear(&mut self) {
        self.items.clear();
        self.order_discount_cents = 0;
    }

    /// Subtotal: Σ(unit price × quantity) over all lines, before discounts.
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(|i| i.gross_cents()).sum()
    }

    /// Total discount: Σ(line discounts) + order-level discount.
    pub fn total_discount_cents(&self) -> i64 {
        let line_discounts: i64 = self.items.iter().map(|i| i.discount_cents).sum();
        line_discounts + self.order_discount_cents
    }

    /// Grand total: subtotal − total discount.
    ///
    /// Never negative by construction: line discounts are bounded per line
    /// and the order discount is bounded by the subtotal.
    pub fn total_cents(&self) -> i64 {
        self.subtotal_cents() - self.total_discount_cents()
    }

    /// Number of unique lines in the cart.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Freezes all lines into invoice item snapshots, in line order.
    pub fn to_invoice_items(&self) -> Vec<InvoiceItem> {
        self.items.iter().map(|i| i.to_invoice_item()).collect()
    }
}
