//! # Payment Ledger
//!
//! Records payments against invoices and enforces the payment invariants.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Payment Acceptance                             │
//! │                                                                     │
//! │  record_payment(invoice, amount, ...)                               │
//! │       │                                                             │
//! │       ├── invoice cancelled?          → InvoiceClosed               │
//! │       ├── amount <= 0?                → MustBePositive              │
//! │       ├── amount > balance + 1 cent?  → Overpayment                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  amount_paid += amount                                              │
//! │  status = derive_status(total, amount_paid)                         │
//! │  → Payment appended (immutable, no edit/delete path)                │
//! │                                                                     │
//! │  Split payments validate cash + card == stated amount BEFORE any    │
//! │  mutation; a rejected split leaves the invoice exactly as it was.   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::status::derive_status;
use crate::types::{Invoice, InvoiceStatus, Payment, PaymentMethod};
use crate::validation::validate_payment_amount;
use crate::PAYMENT_TOLERANCE_CENTS;

/// A split tender: one logical payment expressed as cash + card components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitTender {
    pub cash_cents: i64,
    pub card_cents: i64,
}

impl SplitTender {
    /// Sum of the two components.
    pub const fn sum_cents(&self) -> i64 {
        self.cash_cents + self.card_cents
    }
}

/// Validates that split components sum to the stated amount.
///
/// Accepted iff `|cash + card − stated| <= 1 cent`. The confirmation
/// control must stay disabled until this passes.
pub fn validate_split(split: SplitTender, stated_cents: i64) -> CoreResult<()> {
    if split.cash_cents < 0 || split.card_cents < 0 {
        return Err(crate::error::ValidationError::MustBePositive {
            field: "split component".to_string(),
        }
        .into());
    }

    if (split.sum_cents() - stated_cents).abs() > PAYMENT_TOLERANCE_CENTS {
        return Err(CoreError::SplitMismatch {
            cash_cents: split.cash_cents,
            card_cents: split.card_cents,
            stated_cents,
        });
    }

    Ok(())
}

/// Records a payment against an invoice.
///
/// All checks run before any mutation; a rejected payment leaves the
/// invoice exactly as it was. On acceptance `amount_paid` increases and
/// the status is re-derived (never cached separately).
pub fn record_payment(
    invoice: &mut Invoice,
    amount_cents: i64,
    method: PaymentMethod,
    reference: Option<String>,
    received_by: &str,
    received_at: DateTime<Utc>,
) -> CoreResult<Payment> {
    check_accepts_payment(invoice, amount_cents)?;
    Ok(apply_payment(
        invoice,
        amount_cents,
        method,
        reference,
        received_by,
        received_at,
    ))
}

/// Records a split (cash + card) payment as one logical payment.
///
/// The component sum is validated against the stated amount, and the
/// stated amount against the balance due, before anything is applied.
/// Zero components are skipped, so a 0/100 "split" records one payment.
pub fn record_split_payment(
    invoice: &mut Invoice,
    amount_cents: i64,
    split: SplitTender,
    reference: Option<String>,
    received_by: &str,
    received_at: DateTime<Utc>,
) -> CoreResult<Vec<Payment>> {
    validate_split(split, amount_cents)?;
    check_accepts_payment(invoice, amount_cents)?;

    let mut payments = Vec::with_capacity(2);
    if split.cash_cents > 0 {
        payments.push(apply_payment(
            invoice,
            split.cash_cents,
            PaymentMethod::Cash,
            reference.clone(),
            received_by,
            received_at,
        ));
    }
    if split.card_cents > 0 {
        payments.push(apply_payment(
            invoice,
            split.card_cents,
            PaymentMethod::Card,
            reference,
            received_by,
            received_at,
        ));
    }

    Ok(payments)
}

/// Cancels an invoice regardless of its payment state.
///
/// Once cancelled no further payments are accepted; cancelling twice is
/// rejected so the operator sees the invoice was already closed.
pub fn cancel_invoice(invoice: &mut Invoice) -> CoreResult<()> {
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(CoreError::InvoiceClosed {
            invoice_id: invoice.id.clone(),
            status: invoice.status.to_string(),
        });
    }

    invoice.status = InvoiceStatus::Cancelled;
    Ok(())
}

/// Runs every acceptance check without mutating anything.
fn check_accepts_payment(invoice: &Invoice, amount_cents: i64) -> CoreResult<()> {
    if invoice.is_closed() {
        return Err(CoreError::InvoiceClosed {
            invoice_id: invoice.id.clone(),
            status: invoice.status.to_string(),
        });
    }

    validate_payment_amount(amount_cents)?;

    let balance_due = invoice.balance_due_cents();
    if amount_cents > balance_due + PAYMENT_TOLERANCE_CENTS {
        return Err(CoreError::Overpayment {
            amount_cents,
            balance_due_cents: balance_due,
        });
    }

    Ok(())
}

/// Applies an already-validated payment.
fn apply_payment(
    invoice: &mut Invoice,
    amount_cents: i64,
    method: PaymentMethod,
    reference: Option<String>,
    received_by: &str,
    received_at: DateTime<Utc>,
) -> Payment {
    invoice.amount_paid_cents += amount_cents;
    invoice.status = derive_status(invoice.total_cents, invoice.amount_paid_cents);

    Payment {
        id: Uuid::new_v4().to_string(),
        invoice_id: invoice.id.clone(),
        amount_cents,
        method,
        reference,
        received_by: received_by.to_string(),
        received_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(total_cents: i64) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            customer_id: "c-1".to_string(),
            branch_id: "br-1".to_string(),
            items: Vec::new(),
            subtotal_cents: total_cents,
            discount_cents: 0,
            total_cents,
            amount_paid_cents: 0,
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn pay(inv: &mut Invoice, amount: i64) -> CoreResult<Payment> {
        record_payment(inv, amount, PaymentMethod::Cash, None, "staff-1", Utc::now())
    }

    /// Scenario: total 250.00, pay 100.00 → partial, balance 150.00;
    /// pay 150.00 → paid, balance 0.
    #[test]
    fn test_deposit_then_settlement() {
        let mut inv = invoice(25000);

        pay(&mut inv, 10000).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Partial);
        assert_eq!(inv.balance_due_cents(), 15000);

        pay(&mut inv, 15000).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.balance_due_cents(), 0);
    }

    /// Scenario: total 100.00, attempted payment 150.00 → rejected,
    /// amount_paid unchanged.
    #[test]
    fn test_overpayment_rejected_without_mutation() {
        let mut inv = invoice(10000);

        let err = pay(&mut inv, 15000).unwrap_err();
        assert!(matches!(err, CoreError::Overpayment { .. }));
        assert_eq!(inv.amount_paid_cents, 0);
        assert_eq!(inv.status, InvoiceStatus::Pending);
    }

    #[test]
    fn test_one_cent_over_is_tolerated() {
        let mut inv = invoice(10000);
        pay(&mut inv, 10001).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        // balance_due may dip to -1 cent, never below the tolerance
        assert!(inv.balance_due_cents() >= -PAYMENT_TOLERANCE_CENTS);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut inv = invoice(10000);
        assert!(pay(&mut inv, 0).is_err());
        assert!(pay(&mut inv, -500).is_err());
        assert_eq!(inv.amount_paid_cents, 0);
    }

    #[test]
    fn test_settled_invoice_rejects_further_payments() {
        let mut inv = invoice(10000);
        pay(&mut inv, 10000).unwrap();

        let err = pay(&mut inv, 100).unwrap_err();
        assert!(matches!(err, CoreError::Overpayment { .. }));
        assert_eq!(inv.amount_paid_cents, 10000);
    }

    /// Scenario: split 60+30 against 100 rejected; 70+30 accepted.
    #[test]
    fn test_split_validation() {
        let mut inv = invoice(10000);

        let bad = SplitTender {
            cash_cents: 6000,
            card_cents: 3000,
        };
        let err = record_split_payment(&mut inv, 10000, bad, None, "staff-1", Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { .. }));
        assert_eq!(inv.amount_paid_cents, 0);
        assert_eq!(inv.status, InvoiceStatus::Pending);

        let good = SplitTender {
            cash_cents: 7000,
            card_cents: 3000,
        };
        let payments =
            record_split_payment(&mut inv, 10000, good, None, "staff-1", Utc::now()).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].method, PaymentMethod::Cash);
        assert_eq!(payments[0].amount_cents, 7000);
        assert_eq!(payments[1].method, PaymentMethod::Card);
        assert_eq!(payments[1].amount_cents, 3000);
        assert_eq!(inv.amount_paid_cents, 10000);
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_split_within_one_cent_accepted() {
        assert!(validate_split(
            SplitTender {
                cash_cents: 4999,
                card_cents: 5000
            },
            10000
        )
        .is_ok());
        assert!(validate_split(
            SplitTender {
                cash_cents: 4998,
                card_cents: 5000
            },
            10000
        )
        .is_err());
    }

    #[test]
    fn test_split_zero_component_records_single_payment() {
        let mut inv = invoice(10000);
        let split = SplitTender {
            cash_cents: 0,
            card_cents: 10000,
        };
        let payments =
            record_split_payment(&mut inv, 10000, split, None, "staff-1", Utc::now()).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].method, PaymentMethod::Card);
    }

    #[test]
    fn test_split_negative_component_rejected() {
        let mut inv = invoice(10000);
        let split = SplitTender {
            cash_cents: -100,
            card_cents: 10100,
        };
        assert!(
            record_split_payment(&mut inv, 10000, split, None, "staff-1", Utc::now()).is_err()
        );
        assert_eq!(inv.amount_paid_cents, 0);
    }

    #[test]
    fn test_split_exceeding_balance_rejected_whole() {
        let mut inv = invoice(10000);
        pay(&mut inv, 5000).unwrap();

        // Components agree with the stated amount but exceed the balance
        let split = SplitTender {
            cash_cents: 4000,
            card_cents: 4000,
        };
        let err = record_split_payment(&mut inv, 8000, split, None, "staff-1", Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Overpayment { .. }));
        assert_eq!(inv.amount_paid_cents, 5000);
    }

    #[test]
    fn test_cancelled_invoice_accepts_nothing() {
        let mut inv = invoice(25000);
        pay(&mut inv, 10000).unwrap();

        cancel_invoice(&mut inv).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Cancelled);

        let err = pay(&mut inv, 100).unwrap_err();
        assert!(matches!(err, CoreError::InvoiceClosed { .. }));
        assert_eq!(inv.amount_paid_cents, 10000);

        // Re-cancellation is rejected too
        assert!(matches!(
            cancel_invoice(&mut inv).unwrap_err(),
            CoreError::InvoiceClosed { .. }
        ));
    }

    /// balance_due == total − amount_paid after every accepted payment,
    /// and never below -1 cent.
    #[test]
    fn test_balance_invariant_across_sequence() {
        let mut inv = invoice(33350);
        for amount in [5000, 12000, 9999, 6351] {
            pay(&mut inv, amount).unwrap();
            assert_eq!(
                inv.balance_due_cents(),
                inv.total_cents - inv.amount_paid_cents
            );
            assert!(inv.balance_due_cents() >= -PAYMENT_TOLERANCE_CENTS);
        }
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }
}
