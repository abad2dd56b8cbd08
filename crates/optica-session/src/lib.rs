//! # Optica Session - Terminal Session State
//!
//! The stateful, async layer a sales terminal runs on top of
//! `optica-core`: debounced catalog search, the live cart, and checkout
//! submission with a double-submit guard.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       optica-session                                │
//! │                                                                     │
//! │  ┌───────────────┐          ┌──────────────────────────────┐        │
//! │  │ CatalogSearch │──trait──►│ CatalogSource (db / remote)  │        │
//! │  │ (debounce +   │          └──────────────────────────────┘        │
//! │  │  generations) │                                                  │
//! │  └───────────────┘                                                  │
//! │  ┌───────────────┐          ┌──────────────────────────────┐        │
//! │  │CheckoutSession│──trait──►│ InvoiceBackend (db / remote) │        │
//! │  │ (cart + lock) │          └──────────────────────────────┘        │
//! │  └───────────────┘                                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both seams are traits so the session logic tests against mocks and
//! deploys against either the local database or a remote API.

pub mod checkout;
pub mod error;
pub mod search;

pub use checkout::{CheckoutReceipt, CheckoutSession, InvoiceBackend, SubmitGuard, SubmitLock};
pub use error::{SessionError, SessionResult};
pub use search::{
    CatalogSearch, CatalogSource, SearchOutcome, SearchTicket, MIN_QUERY_LEN, SEARCH_DEBOUNCE,
};
