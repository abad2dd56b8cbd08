//! # optica-core: Pure Business Logic for Optica POS
//!
//! This crate is the **heart** of the Optica sales pipeline. It contains the
//! business rules of the transaction flow as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Optica Sales Pipeline                            │
//! │                                                                     │
//! │  Catalog Lookup ──► Cart ──► Checkout ──► Invoice + Payments        │
//! │                                               │                     │
//! │                                               ▼                     │
//! │                                           Job Card                  │
//! │                                     (lab fulfillment)               │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │               ★ optica-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │  ┌────────┐ ┌───────┐ ┌──────────┐ ┌────────┐ ┌─────────┐    │  │
//! │  │  │  cart  │ │checkout│ │  ledger  │ │ status │ │ jobcard │    │  │
//! │  │  └────────┘ └───────┘ └──────────┘ └────────┘ └─────────┘    │  │
//! │  │                                                               │  │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                                │                                    │
//! │            ┌───────────────────┴──────────────────┐                 │
//! │            ▼                                      ▼                 │
//! │  optica-db (SQLite persistence)    optica-session (interactive UI)  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Invoice, Payment, JobCard, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`cart`] - Cart composition and pricing
//! - [`checkout`] - Checkout request building and validation
//! - [`ledger`] - Payment ledger and split-payment rules
//! - [`status`] - Invoice status derivation
//! - [`jobcard`] - Lab job-card state machine
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **All-or-Nothing**: A rejected operation leaves its input exactly as it was

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod jobcard;
pub mod ledger;
pub mod money;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use optica_core::Money` instead of
// `use optica_core::money::Money`

pub use cart::{Cart, CartItem};
pub use checkout::{build_checkout_request, CheckoutRequest, InitialPayment};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tolerance for payment comparisons, in cents.
///
/// ## Why a tolerance?
/// Amounts arrive from operator input and external terminals that round to
/// two decimal places. A payment is accepted when it is within one cent of
/// the balance due, and a split is accepted when its components sum to
/// within one cent of the stated amount.
pub const PAYMENT_TOLERANCE_CENTS: i64 = 1;

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
