//! # Repository Layer
//!
//! One repository per aggregate, each owning its SQL.
//!
//! ## Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                               │
//! │                                                                     │
//! │  load row(s) ──► optica-core rule (pure) ──► persist in one tx      │
//! │                                                                     │
//! │  Business rules never live in SQL: the ledger and the job-card      │
//! │  state machine run in memory first, and only accepted results are   │
//! │  written. A rejected operation writes nothing.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod invoice;
pub mod job_card;

pub use catalog::CatalogRepository;
pub use invoice::InvoiceRepository;
pub use job_card::JobCardRepository;
