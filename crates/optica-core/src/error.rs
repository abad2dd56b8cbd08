//! # Error Types
//!
//! Domain-specific error types for optica-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  optica-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  optica-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  optica-session errors (separate crate)                             │
//! │  └── SessionError     - Transport failures, submission guard        │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError/SessionError → UI      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (amounts, IDs, states)
//! 3. Errors are enum variants, never String
//! 4. Every error is recoverable at the point of the user action: the
//!    offending operation is rejected and the underlying state is left
//!    exactly as it was

use thiserror::Error;

use crate::types::JobStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the sales pipeline.
/// They should be caught and translated to user-facing messages at the
/// control that triggered them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Split-payment components don't sum to the stated amount.
    ///
    /// ## When This Occurs
    /// - Operator enters cash + card components for a split tender and the
    ///   two don't add up (within the one-cent tolerance)
    ///
    /// ## User Workflow
    /// ```text
    /// Split payment: amount 100.00
    ///      │
    ///      ▼
    /// cash 60.00 + card 30.00 = 90.00 ≠ 100.00
    ///      │
    ///      ▼
    /// SplitMismatch → confirm button stays disabled until corrected
    /// ```
    #[error(
        "Split components {cash_cents} + {card_cents} do not sum to stated amount {stated_cents}"
    )]
    SplitMismatch {
        cash_cents: i64,
        card_cents: i64,
        stated_cents: i64,
    },

    /// Payment amount exceeds the invoice balance due.
    #[error("Payment of {amount_cents} exceeds balance due of {balance_due_cents}")]
    Overpayment {
        amount_cents: i64,
        balance_due_cents: i64,
    },

    /// Mutation attempted on an invoice that no longer accepts it.
    ///
    /// ## When This Occurs
    /// - Recording a payment against a cancelled invoice
    /// - Cancelling an invoice that is already cancelled
    #[error("Invoice {invoice_id} is {status}, no further changes accepted")]
    InvoiceClosed { invoice_id: String, status: String },

    /// Job-card status change out of sequence.
    ///
    /// The lab workflow only ever moves forward along
    /// pending → in_progress → quality_check → completed, with cancellation
    /// allowed from any non-terminal state.
    #[error("Job card {job_id} cannot move from {from:?} to {to:?}")]
    IllegalTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must have members is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed amount, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SplitMismatch {
            cash_cents: 6000,
            card_cents: 3000,
            stated_cents: 10000,
        };
        assert_eq!(
            err.to_string(),
            "Split components 6000 + 3000 do not sum to stated amount 10000"
        );

        let err = CoreError::Overpayment {
            amount_cents: 15000,
            balance_due_cents: 10000,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 15000 exceeds balance due of 10000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer".to_string(),
        };
        assert_eq!(err.to_string(), "customer is required");

        let err = ValidationError::Empty {
            field: "cart".to_string(),
        };
        assert_eq!(err.to_string(), "cart must not be empty");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
