//! Session-layer error types.

use thiserror::Error;

use optica_core::CoreError;

/// Errors surfaced to the terminal operator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A domain rule rejected the operation (validation, ledger,
    /// state machine). The message is operator-facing.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The invoice owner could not be reached or answered with a
    /// transport failure. The cart is preserved; the submission may be
    /// retried.
    #[error("network error: {0}")]
    Network(String),

    /// A checkout submission is already awaiting a response; the new
    /// attempt was not sent.
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

/// Session result type alias.
pub type SessionResult<T> = Result<T, SessionError>;
