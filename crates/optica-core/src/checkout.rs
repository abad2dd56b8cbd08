//! # Checkout
//!
//! Builds and validates the invoice-creation request from a cart.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Submission                             │
//! │                                                                     │
//! │  Cart + selected customer + initial payment                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  build_checkout_request()  ← THIS MODULE                            │
//! │       │                                                             │
//! │       ├── no customer?   → ValidationError, cart untouched          │
//! │       ├── empty cart?    → ValidationError, cart untouched          │
//! │       ├── bad deposit?   → error, cart untouched                    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  CheckoutRequest { request_id, frozen items, totals, deposit }      │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  optica-session submits it; the cart is cleared only after the      │
//! │  server accepts. On rejection the cart is preserved unchanged.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{InvoiceItem, PaymentMethod};

/// The payment taken at checkout time.
///
/// Amount 0 is valid: a deposit-free order placed as pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialPayment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
}

impl InitialPayment {
    /// A zero deposit: order placed as pending.
    pub fn none() -> Self {
        InitialPayment {
            amount_cents: 0,
            method: PaymentMethod::Cash,
        }
    }
}

/// The invoice-creation request submitted to the invoice owner.
///
/// Items are frozen copies of the cart lines; the cart itself stays
/// untouched until the server accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Client-generated idempotency token. A retried submission (double
    /// click, replayed network call) carries the same id and must not
    /// create a second invoice.
    pub request_id: Uuid,
    pub customer_id: String,
    pub branch_id: String,
    pub items: Vec<InvoiceItem>,
    pub subtotal_cents: i64,
    /// Total discount: per-line discounts plus the order-level discount.
    pub discount_cents: i64,
    pub total_cents: i64,
    pub initial_payment: InitialPayment,
}

/// Validates the cart and customer selection and freezes them into a
/// [`CheckoutRequest`].
///
/// ## Preconditions
/// - A customer must be selected
/// - The cart must be non-empty
/// - The initial payment must be between 0 and the computed total
///
/// Violations fail with the offending precondition named; the cart is left
/// untouched so the operator can correct and retry.
pub fn build_checkout_request(
    cart: &Cart,
    customer_id: Option<&str>,
    branch_id: &str,
    initial_payment: InitialPayment,
) -> CoreResult<CheckoutRequest> {
    let customer_id = customer_id
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::Required {
            field: "customer".to_string(),
        })?;

    if cart.is_empty() {
        return Err(ValidationError::Empty {
            field: "cart".to_string(),
        }
        .into());
    }

    let total_cents = cart.total_cents();

    if initial_payment.amount_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "initial payment".to_string(),
            min: 0,
            max: total_cents,
        }
        .into());
    }

    if initial_payment.amount_cents > total_cents {
        return Err(CoreError::Overpayment {
            amount_cents: initial_payment.amount_cents,
            balance_due_cents: total_cents,
        });
    }

    Ok(CheckoutRequest {
        request_id: Uuid::new_v4(),
        customer_id: customer_id.to_string(),
        branch_id: branch_id.to_string(),
        items: cart.to_invoice_items(),
        subtotal_cents: cart.subtotal_cents(),
        discount_cents: cart.total_discount_cents(),
        total_cents,
        initial_payment,
    })
}
