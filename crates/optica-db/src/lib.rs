//! # Optica DB - Persistence Layer
//!
//! SQLite persistence for the Optica sales transaction pipeline.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         optica-db                                   │
//! │                                                                     │
//! │  ┌──────────┐   ┌──────────────────────────────────────────────┐    │
//! │  │ Database │──►│ repositories: catalog / invoice / job_card   │    │
//! │  │  (pool)  │   │ load rows ──► optica-core rules ──► persist  │    │
//! │  └──────────┘   └──────────────────────────────────────────────┘    │
//! │        │                                                            │
//! │        └── embedded migrations (sqlx::migrate!)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All domain decisions (ledger rules, status derivation, the job card
//! state machine) live in `optica-core`; this crate owns SQL and
//! transactions only.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{CatalogRepository, InvoiceRepository, JobCardRepository};
