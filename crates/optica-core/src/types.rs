//! # Domain Types
//!
//! Core domain types used throughout the Optica sales pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │    Product    │   │    Invoice    │   │    Payment    │          │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │          │
//! │  │  id           │   │  id           │   │  id           │          │
//! │  │  kind         │   │  items        │   │  invoice_id   │          │
//! │  │  price_cents  │   │  total_cents  │   │  method       │          │
//! │  │  stock        │   │  amount_paid  │   │  amount_cents │          │
//! │  └───────────────┘   └───────────────┘   └───────────────┘          │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │ InvoiceStatus │   │   JobStatus   │   │ PaymentMethod │          │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │          │
//! │  │  Pending      │   │  Pending      │   │  Cash         │          │
//! │  │  Partial      │   │  InProgress   │   │  Card         │          │
//! │  │  Paid         │   │  QualityCheck │   │  BankTransfer │          │
//! │  │  Overdue      │   │  Completed    │   └───────────────┘          │
//! │  │  Cancelled    │   │  Cancelled    │                              │
//! │  └───────────────┘   └───────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Invoice items are frozen copies of cart lines. The invoice keeps
//! displaying what was actually sold even if catalog records change later.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// The catalog variant of a sellable item.
///
/// Frames, lenses, and contact lenses go through the lab; services
/// (adjustments, repairs, eye exams) are sold as-is and carry no stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Frame,
    Lens,
    ContactLens,
    Service,
}

impl ProductKind {
    /// Wire/storage form of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Frame => "frame",
            ProductKind::Lens => "lens",
            ProductKind::ContactLens => "contact_lens",
            ProductKind::Service => "service",
        }
    }

    /// Whether a sold item of this kind needs lab fabrication or fitting.
    pub const fn requires_lab_work(&self) -> bool {
        !matches!(self, ProductKind::Service)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frame" => Ok(ProductKind::Frame),
            "lens" => Ok(ProductKind::Lens),
            "contact_lens" => Ok(ProductKind::ContactLens),
            "service" => Ok(ProductKind::Service),
            other => Err(ValidationError::InvalidFormat {
                field: "product kind".to_string(),
                reason: format!("unknown kind '{other}'"),
            }),
        }
    }
}

/// A catalog product as observed by the cart.
///
/// Immutable from the pipeline's perspective; the catalog owns it. `stock`
/// is informational only here - the server is the final arbiter at
/// checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Catalog variant (frame, lens, contact lens, service).
    pub kind: ProductKind,

    /// Display name shown to the operator and on the invoice.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Available stock. `None` for services, which have no stock.
    pub stock: Option<i64>,

    /// Descriptive metadata (brand/material/power range, free-form).
    pub details: Option<String>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// The composite key a cart line for this product is stored under.
    pub fn line_key(&self) -> LineKey {
        LineKey {
            kind: self.kind,
            product_id: self.id.clone(),
        }
    }
}

/// Composite key identifying a cart line: (variant, product id).
///
/// Two catalog entries of different kinds may share an id space, so the
/// kind is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub kind: ProductKind,
    pub product_id: String,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The status of an invoice.
///
/// Pending/Partial/Paid are derived from payment state (see [`crate::status`]).
/// Overdue is assigned by reporting layers with due-date knowledge.
/// Cancelled is an explicit operator action and is terminal for payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// No payment recorded yet.
    Pending,
    /// Deposit taken, balance outstanding. Displayed as "deposit_paid" in
    /// some screens.
    Partial,
    /// Fully settled.
    Paid,
    /// Past due date with an outstanding balance (reporting-assigned).
    Overdue,
    /// Explicitly cancelled; accepts no further payments.
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "invoice status".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Direct bank transfer.
    BankTransfer,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("unknown method '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A persisted sale record with its items and running payment state.
///
/// ## Invariants
/// - `total_cents = subtotal_cents - discount_cents`
/// - `balance_due_cents() = total_cents - amount_paid_cents`, never below
///   `-PAYMENT_TOLERANCE_CENTS`
/// - `amount_paid_cents` only ever increases, and only via the ledger
/// - Items are frozen at creation and never edited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub branch_id: String,
    pub items: Vec<InvoiceItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Remaining amount owed on this invoice.
    #[inline]
    pub fn balance_due_cents(&self) -> i64 {
        self.total_cents - self.amount_paid_cents
    }

    /// Whether the invoice accepts further payments.
    ///
    /// Cancellation closes an invoice for good; full settlement closes it
    /// too, but the Overpayment check reports that case with the balance
    /// context instead.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Whether any line on this invoice needs a lab job card.
    pub fn requires_lab_work(&self) -> bool {
        self.items.iter().any(|i| i.item_kind.requires_lab_work())
    }
}

/// A line item on an invoice.
///
/// Frozen copy of a cart line at checkout time (snapshot pattern).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Catalog variant of the sold item.
    pub item_kind: ProductKind,
    /// Catalog id of the sold item.
    pub item_id: String,
    /// Description at time of sale (frozen).
    pub description: String,
    /// Quantity sold.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line discount in cents.
    pub discount_cents: i64,
    /// Line total: unit_price × quantity − discount.
    pub total_cents: i64,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment recorded against an invoice.
///
/// Immutable once created; the ledger is append-only. There is no edit or
/// delete path in this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    /// Amount paid in cents (always > 0).
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// External reference (card auth code, transfer id, etc.).
    pub reference: Option<String>,
    /// Staff member who took the payment.
    pub received_by: String,
    pub received_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Job Card
// =============================================================================

/// Lab fulfillment status of a job card.
///
/// See [`crate::jobcard`] for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    QualityCheck,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::QualityCheck => "quality_check",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no transitions at all.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "quality_check" => Ok(JobStatus::QualityCheck),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "job status".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

/// The lab work order tracking fabrication/fitting for an invoice.
///
/// References the invoice; never owns it. Mutated only via
/// [`JobCard::transition_to`](crate::jobcard) status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCard {
    pub id: String,
    pub invoice_id: String,
    /// Human-readable job number (e.g. JOB-20260829-0421).
    pub job_number: String,
    pub status: JobStatus,
    /// Prescription snapshot for the lab bench (frozen at creation).
    pub prescription_details: Option<String>,
    /// Frame details snapshot.
    pub frame_details: Option<String>,
    /// Lens details snapshot.
    pub lens_details: Option<String>,
    pub special_instructions: Option<String>,
    /// Set exactly once, on the pending → in_progress transition.
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly once, on the transition into completed.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
