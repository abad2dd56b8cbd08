//! # Invoice Repository
//!
//! Database operations for invoices, their items, and their payments.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Invoice Lifecycle                              │
//! │                                                                     │
//! │  1. CREATE (checkout submission, one transaction)                   │
//! │     └── create_from_checkout() → invoice + items + deposit payment  │
//! │         A replayed request_id returns the existing invoice          │
//! │         instead of creating a second one.                           │
//! │                                                                     │
//! │  2. PAY (any number of times until settled)                         │
//! │     └── add_payment() / add_split_payment()                         │
//! │         Ledger rules run in memory first; only accepted payments    │
//! │         are written, together with the recomputed status.           │
//! │                                                                     │
//! │  3. (OPTIONAL) CANCEL                                               │
//! │     └── cancel() → status 'cancelled', no further payments          │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use optica_core::checkout::CheckoutRequest;
use optica_core::ledger::{self, SplitTender};
use optica_core::{CoreError, Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentMethod};

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    customer_id: String,
    branch_id: String,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    amount_paid_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct InvoiceItemRow {
    item_kind: String,
    item_id: String,
    description: String,
    quantity: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    total_cents: i64,
}

impl InvoiceItemRow {
    fn into_item(self) -> DbResult<InvoiceItem> {
        Ok(InvoiceItem {
            item_kind: self.item_kind.parse().map_err(CoreError::from)?,
            item_id: self.item_id,
            description: self.description,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    invoice_id: String,
    amount_cents: i64,
    method: String,
    reference: Option<String>,
    received_by: String,
    received_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> DbResult<Payment> {
        Ok(Payment {
            id: self.id,
            invoice_id: self.invoice_id,
            amount_cents: self.amount_cents,
            method: self.method.parse().map_err(CoreError::from)?,
            reference: self.reference,
            received_by: self.received_by,
            received_at: self.received_at,
        })
    }
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates an invoice from a checkout request, atomically.
    ///
    /// Invoice, items, and the initial deposit payment (if any) are
    /// written in a single transaction: either the whole checkout lands
    /// or none of it does.
    ///
    /// ## Idempotency
    /// The request's client-generated `request_id` is UNIQUE in storage.
    /// A replayed submission (double click, retried network call) returns
    /// the invoice created the first time instead of creating a second
    /// one or double-recording the deposit.
    pub async fn create_from_checkout(
        &self,
        req: &CheckoutRequest,
        received_by: &str,
    ) -> DbResult<Invoice> {
        let request_id = req.request_id.to_string();

        if let Some(existing) = self.get_by_request_id(&request_id).await? {
            info!(invoice_id = %existing.id, request_id = %request_id, "Replayed checkout request, returning existing invoice");
            return Ok(existing);
        }

        let now = Utc::now();
        let mut invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            customer_id: req.customer_id.clone(),
            branch_id: req.branch_id.clone(),
            items: req.items.clone(),
            subtotal_cents: req.subtotal_cents,
            discount_cents: req.discount_cents,
            total_cents: req.total_cents,
            amount_paid_cents: 0,
            status: InvoiceStatus::Pending,
            created_at: now,
        };

        // Apply the deposit through the ledger so the stored status is the
        // derived one (pending for a zero deposit, partial/paid otherwise)
        let deposit = if req.initial_payment.amount_cents > 0 {
            Some(ledger::record_payment(
                &mut invoice,
                req.initial_payment.amount_cents,
                req.initial_payment.method,
                None,
                received_by,
                now,
            )?)
        } else {
            None
        };

        debug!(invoice_id = %invoice.id, total = invoice.total_cents, "Inserting invoice");

        let mut tx = self.pool.begin().await?;

        let insert = sqlx::query(
            r#"
            INSERT INTO invoices (
                id, request_id, customer_id, branch_id,
                subtotal_cents, discount_cents, total_cents, amount_paid_cents,
                status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&invoice.id)
        .bind(&request_id)
        .bind(&invoice.customer_id)
        .bind(&invoice.branch_id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.total_cents)
        .bind(invoice.amount_paid_cents)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            let err = DbError::from(err);
            if err.is_unique_violation() {
                // Lost a race with a concurrent replay of the same request
                drop(tx);
                if let Some(existing) = self.get_by_request_id(&request_id).await? {
                    return Ok(existing);
                }
            }
            return Err(err);
        }

        for (position, item) in invoice.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, item_kind, item_id, description,
                    quantity, unit_price_cents, discount_cents, total_cents, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&invoice.id)
            .bind(item.item_kind.as_str())
            .bind(&item.item_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(item.total_cents)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(payment) = &deposit {
            insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            total = invoice.total_cents,
            deposit = req.initial_payment.amount_cents,
            status = %invoice.status,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Gets an invoice with its items by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, branch_id,
                   subtotal_cents, discount_cents, total_cents, amount_paid_cents,
                   status, created_at
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Gets an invoice by its checkout request id (idempotency lookups).
    pub async fn get_by_request_id(&self, request_id: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, branch_id,
                   subtotal_cents, discount_cents, total_cents, amount_paid_cents,
                   status, created_at
            FROM invoices
            WHERE request_id = ?1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Attaches items to an invoice row, in cart order.
    async fn hydrate(&self, row: InvoiceRow) -> DbResult<Invoice> {
        let item_rows: Vec<InvoiceItemRow> = sqlx::query_as(
            r#"
            SELECT item_kind, item_id, description,
                   quantity, unit_price_cents, discount_cents, total_cents
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(InvoiceItemRow::into_item)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Invoice {
            id: row.id,
            customer_id: row.customer_id,
            branch_id: row.branch_id,
            items,
            subtotal_cents: row.subtotal_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            amount_paid_cents: row.amount_paid_cents,
            status: row.status.parse().map_err(CoreError::from)?,
            created_at: row.created_at,
        })
    }

    /// Gets all payments for an invoice, oldest first.
    pub async fn get_payments(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, amount_cents, method, reference, received_by, received_at
            FROM payments
            WHERE invoice_id = ?1
            ORDER BY received_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    /// Records a payment against an invoice.
    ///
    /// The ledger runs on the loaded invoice first; a rejection
    /// (overpayment, cancelled invoice, non-positive amount) writes
    /// nothing. Acceptance persists the payment row and the recomputed
    /// amount_paid/status in one transaction.
    pub async fn add_payment(
        &self,
        invoice_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        reference: Option<String>,
        received_by: &str,
    ) -> DbResult<Invoice> {
        let mut invoice = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        let prev_paid_cents = invoice.amount_paid_cents;

        let payment = ledger::record_payment(
            &mut invoice,
            amount_cents,
            method,
            reference,
            received_by,
            Utc::now(),
        )?;

        let mut tx = self.pool.begin().await?;
        insert_payment(&mut tx, &payment).await?;
        update_payment_state(&mut tx, &invoice, prev_paid_cents).await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            amount = amount_cents,
            balance_due = invoice.balance_due_cents(),
            status = %invoice.status,
            "Payment recorded"
        );

        Ok(invoice)
    }

    /// Records a split (cash + card) payment as one logical payment.
    ///
    /// Component-sum and balance validation happen before anything is
    /// written; a mismatch persists nothing.
    pub async fn add_split_payment(
        &self,
        invoice_id: &str,
        amount_cents: i64,
        split: SplitTender,
        reference: Option<String>,
        received_by: &str,
    ) -> DbResult<Invoice> {
        let mut invoice = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        let prev_paid_cents = invoice.amount_paid_cents;

        let payments = ledger::record_split_payment(
            &mut invoice,
            amount_cents,
            split,
            reference,
            received_by,
            Utc::now(),
        )?;

        let mut tx = self.pool.begin().await?;
        for payment in &payments {
            insert_payment(&mut tx, payment).await?;
        }
        update_payment_state(&mut tx, &invoice, prev_paid_cents).await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            cash = split.cash_cents,
            card = split.card_cents,
            status = %invoice.status,
            "Split payment recorded"
        );

        Ok(invoice)
    }

    /// Cancels an invoice. Once cancelled it accepts no further payments.
    pub async fn cancel(&self, invoice_id: &str) -> DbResult<Invoice> {
        let mut invoice = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        ledger::cancel_invoice(&mut invoice)?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = ?2
            WHERE id = ?1 AND status != 'cancelled'
            "#,
        )
        .bind(invoice_id)
        .bind(invoice.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a cancel race after the load: the invoice exists but is
            // already closed
            return Err(DbError::Domain(CoreError::InvoiceClosed {
                invoice_id: invoice_id.to_string(),
                status: InvoiceStatus::Cancelled.to_string(),
            }));
        }

        info!(invoice_id = %invoice.id, "Invoice cancelled");

        Ok(invoice)
    }
}

/// Inserts a single payment row inside an open transaction.
async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment: &Payment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, invoice_id, amount_cents, method, reference, received_by, received_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(payment.amount_cents)
    .bind(payment.method.as_str())
    .bind(&payment.reference)
    .bind(&payment.received_by)
    .bind(payment.received_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Persists the ledger's recomputed amount_paid and status.
///
/// Guarded on the amount_paid the ledger ran against: if another
/// connection recorded a payment between our load and this write, the
/// balance check is stale and the whole transaction rolls back instead of
/// overshooting.
async fn update_payment_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    invoice: &Invoice,
    prev_paid_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET amount_paid_cents = ?2, status = ?3
        WHERE id = ?1 AND amount_paid_cents = ?4
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.amount_paid_cents)
    .bind(invoice.status.as_str())
    .bind(prev_paid_cents)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict(format!(
            "invoice {} was paid concurrently",
            invoice.id
        )));
    }

    Ok(())
}
