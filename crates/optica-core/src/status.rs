//! # Invoice Status Derivation
//!
//! Pure function of `(total, amount_paid)` → status.
//!
//! The status is never cached independently of `amount_paid`: the ledger
//! recomputes it after every accepted payment, and the same inputs always
//! yield the same status. Cancellation is an explicit operator action
//! handled in the ledger, not derived here.

use crate::types::InvoiceStatus;
use crate::PAYMENT_TOLERANCE_CENTS;

/// Derives the payment status of an invoice.
///
/// ## Rules
/// - `amount_paid <= 0`                       → Pending
/// - `0 < amount_paid < total - tolerance`    → Partial
/// - `amount_paid >= total - tolerance`       → Paid
///
/// Overdue is a reporting concern (due dates live outside this core) and
/// is never produced here.
///
/// ## Example
/// ```rust
/// use optica_core::status::derive_status;
/// use optica_core::types::InvoiceStatus;
///
/// assert_eq!(derive_status(25000, 0), InvoiceStatus::Pending);
/// assert_eq!(derive_status(25000, 10000), InvoiceStatus::Partial);
/// assert_eq!(derive_status(25000, 25000), InvoiceStatus::Paid);
/// ```
pub fn derive_status(total_cents: i64, amount_paid_cents: i64) -> InvoiceStatus {
    if amount_paid_cents <= 0 {
        InvoiceStatus::Pending
    } else if amount_paid_cents >= total_cents - PAYMENT_TOLERANCE_CENTS {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}
