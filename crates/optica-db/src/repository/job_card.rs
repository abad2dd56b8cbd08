//! # Job Card Repository
//!
//! Database operations for lab work orders.
//!
//! A job card exists for an invoice only when the invoice carries lab
//! work (frames, lenses, contact lenses). Service-only invoices get no
//! card. Status changes go through the state machine in optica-core;
//! the repository just loads, runs the transition, and persists the
//! accepted result.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use optica_core::{CoreError, Invoice, JobCard, JobStatus, ProductKind};

/// Repository for job card database operations.
#[derive(Debug, Clone)]
pub struct JobCardRepository {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct JobCardRow {
    id: String,
    invoice_id: String,
    job_number: String,
    status: String,
    prescription_details: Option<String>,
    frame_details: Option<String>,
    lens_details: Option<String>,
    special_instructions: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JobCardRow {
    fn into_card(self) -> DbResult<JobCard> {
        Ok(JobCard {
            id: self.id,
            invoice_id: self.invoice_id,
            job_number: self.job_number,
            status: self.status.parse().map_err(CoreError::from)?,
            prescription_details: self.prescription_details,
            frame_details: self.frame_details,
            lens_details: self.lens_details,
            special_instructions: self.special_instructions,
            started_at: self.started_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

const SELECT_CARD: &str = r#"
    SELECT id, invoice_id, job_number, status,
           prescription_details, frame_details, lens_details, special_instructions,
           started_at, completed_at, created_at
    FROM job_cards
"#;

impl JobCardRepository {
    /// Creates a new JobCardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobCardRepository { pool }
    }

    /// Creates a job card for an invoice that carries lab work.
    ///
    /// Returns `Ok(None)` for a service-only invoice: no optical work,
    /// no card. Frame and lens detail lines are prefilled from the
    /// invoice items so the lab sees what was sold without opening the
    /// invoice.
    pub async fn create_for_invoice(
        &self,
        invoice: &Invoice,
        prescription_details: Option<String>,
        special_instructions: Option<String>,
    ) -> DbResult<Option<JobCard>> {
        if !invoice.requires_lab_work() {
            return Ok(None);
        }

        let now = Utc::now();
        let mut card = JobCard {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            job_number: String::new(),
            status: JobStatus::Pending,
            prescription_details,
            frame_details: describe_items(invoice, ProductKind::Frame),
            lens_details: describe_lenses(invoice),
            special_instructions,
            started_at: None,
            completed_at: None,
            created_at: now,
        };

        // job_number is UNIQUE; a concurrent creation can claim the number
        // we counted to, so losing that race recounts and retries
        for attempt in 0..JOB_NUMBER_RETRIES {
            card.job_number = self.next_job_number(now).await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO job_cards (
                    id, invoice_id, job_number, status,
                    prescription_details, frame_details, lens_details, special_instructions,
                    started_at, completed_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&card.id)
            .bind(&card.invoice_id)
            .bind(&card.job_number)
            .bind(card.status.as_str())
            .bind(&card.prescription_details)
            .bind(&card.frame_details)
            .bind(&card.lens_details)
            .bind(&card.special_instructions)
            .bind(card.started_at)
            .bind(card.completed_at)
            .bind(card.created_at)
            .execute(&self.pool)
            .await;

            match inserted {
                Ok(_) => {
                    info!(
                        job_id = %card.id,
                        job_number = %card.job_number,
                        invoice_id = %card.invoice_id,
                        "Job card created"
                    );
                    return Ok(Some(card));
                }
                Err(err) => {
                    let err = DbError::from(err);
                    if err.is_unique_violation() && attempt + 1 < JOB_NUMBER_RETRIES {
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(DbError::Internal(
            "could not allocate a unique job number".to_string(),
        ))
    }

    /// Next `JOB-YYYYMMDD-NNNN` number: NNNN is the day's issued count
    /// plus one, so numbers run sequentially per day.
    async fn next_job_number(&self, now: DateTime<Utc>) -> DbResult<String> {
        let prefix = format!("JOB-{}-", now.format("%Y%m%d"));

        let issued: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_cards WHERE job_number LIKE ?1")
                .bind(format!("{prefix}%"))
                .fetch_one(&self.pool)
                .await?;

        Ok(format!("{}{:04}", prefix, issued + 1))
    }

    /// Gets a job card by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<JobCard>> {
        let row: Option<JobCardRow> =
            sqlx::query_as(&format!("{SELECT_CARD} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobCardRow::into_card).transpose()
    }

    /// Gets the job card for an invoice, if one exists.
    pub async fn get_by_invoice(&self, invoice_id: &str) -> DbResult<Option<JobCard>> {
        let row: Option<JobCardRow> =
            sqlx::query_as(&format!("{SELECT_CARD} WHERE invoice_id = ?1"))
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobCardRow::into_card).transpose()
    }

    /// Applies a status transition to a job card.
    ///
    /// The state machine runs on the loaded card; an illegal move
    /// writes nothing. Acceptance persists the new status and whatever
    /// timestamp the transition set.
    pub async fn update_status(&self, id: &str, target: JobStatus) -> DbResult<JobCard> {
        let mut card = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("JobCard", id))?;

        card.transition_to(target, Utc::now())?;

        let result = sqlx::query(
            r#"
            UPDATE job_cards
            SET status = ?2, started_at = ?3, completed_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&card.id)
        .bind(card.status.as_str())
        .bind(card.started_at)
        .bind(card.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("JobCard", id));
        }

        info!(job_id = %card.id, status = %card.status, "Job card status updated");

        Ok(card)
    }
}

/// Retry budget for losing a job-number race to a concurrent creation.
const JOB_NUMBER_RETRIES: u32 = 3;

/// Joins descriptions of invoice items of one kind, or None.
fn describe_items(invoice: &Invoice, kind: ProductKind) -> Option<String> {
    let lines: Vec<&str> = invoice
        .items
        .iter()
        .filter(|i| i.item_kind == kind)
        .map(|i| i.description.as_str())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("; "))
    }
}

/// Lens details cover both lenses and contact lenses.
fn describe_lenses(invoice: &Invoice) -> Option<String> {
    match (
        describe_items(invoice, ProductKind::Lens),
        describe_items(invoice, ProductKind::ContactLens),
    ) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use optica_core::checkout::{build_checkout_request, InitialPayment};
    use optica_core::{Cart, CoreError, Invoice, JobStatus, Product, ProductKind};

    async fn make_invoice(db: &Database, kinds: &[(ProductKind, &str)]) -> Invoice {
        let mut cart = Cart::new();
        for (i, (kind, name)) in kinds.iter().enumerate() {
            cart.add_item(&Product {
                id: format!("p{i}"),
                kind: *kind,
                name: name.to_string(),
                price_cents: 10000,
                stock: Some(5),
                details: None,
            })
            .unwrap();
        }

        let req =
            build_checkout_request(&cart, Some("cust-1"), "branch-1", InitialPayment::none())
                .unwrap();
        db.invoices().create_from_checkout(&req, "staff-1").await.unwrap()
    }

    #[tokio::test]
    async fn test_lab_invoice_gets_card_with_details() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoice = make_invoice(
            &db,
            &[
                (ProductKind::Frame, "Wayfarer Classic"),
                (ProductKind::Lens, "Single Vision 1.5"),
                (ProductKind::Service, "Eye Exam"),
            ],
        )
        .await;

        let card = db
            .job_cards()
            .create_for_invoice(&invoice, Some("OD -1.25".to_string()), None)
            .await
            .unwrap()
            .expect("lab invoice should get a job card");

        assert_eq!(card.status, JobStatus::Pending);
        assert!(card.job_number.starts_with("JOB-"));
        assert_eq!(card.frame_details.as_deref(), Some("Wayfarer Classic"));
        assert_eq!(card.lens_details.as_deref(), Some("Single Vision 1.5"));
        assert_eq!(card.prescription_details.as_deref(), Some("OD -1.25"));

        let found = db
            .job_cards()
            .get_by_invoice(&invoice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, card.id);
    }

    #[tokio::test]
    async fn test_service_only_invoice_gets_no_card() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoice = make_invoice(&db, &[(ProductKind::Service, "Eye Exam")]).await;

        let card = db
            .job_cards()
            .create_for_invoice(&invoice, None, None)
            .await
            .unwrap();
        assert!(card.is_none());
        assert!(db
            .job_cards()
            .get_by_invoice(&invoice.id)
            .await
            .unwrap()
            .is_none());
    }

    /// Several cards created the same day get sequential, distinct
    /// numbers; the UNIQUE constraint never fires on the happy path.
    #[tokio::test]
    async fn test_job_numbers_are_sequential_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jobs = db.job_cards();

        let mut numbers = Vec::new();
        for name in ["Wayfarer", "Clubmaster", "Aviator"] {
            let invoice = make_invoice(&db, &[(ProductKind::Frame, name)]).await;
            let card = jobs
                .create_for_invoice(&invoice, None, None)
                .await
                .unwrap()
                .unwrap();
            numbers.push(card.job_number);
        }

        let day = chrono::Utc::now().format("%Y%m%d").to_string();
        assert_eq!(numbers[0], format!("JOB-{day}-0001"));
        assert_eq!(numbers[1], format!("JOB-{day}-0002"));
        assert_eq!(numbers[2], format!("JOB-{day}-0003"));
    }

    #[tokio::test]
    async fn test_status_lifecycle_persists_timestamps() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoice = make_invoice(&db, &[(ProductKind::Frame, "Clubmaster")]).await;

        let card = db
            .job_cards()
            .create_for_invoice(&invoice, None, None)
            .await
            .unwrap()
            .unwrap();
        let jobs = db.job_cards();

        let started = jobs.update_status(&card.id, JobStatus::InProgress).await.unwrap();
        assert!(started.started_at.is_some());
        assert!(started.completed_at.is_none());

        jobs.update_status(&card.id, JobStatus::QualityCheck).await.unwrap();
        let done = jobs.update_status(&card.id, JobStatus::Completed).await.unwrap();
        assert!(done.completed_at.is_some());

        // Round-trip: timestamps survived persistence
        let stored = jobs.get_by_id(&card.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.started_at, started.started_at);
        assert_eq!(stored.completed_at, done.completed_at);
    }

    #[tokio::test]
    async fn test_illegal_transition_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoice = make_invoice(&db, &[(ProductKind::Lens, "Progressive 1.6")]).await;

        let card = db
            .job_cards()
            .create_for_invoice(&invoice, None, None)
            .await
            .unwrap()
            .unwrap();
        let jobs = db.job_cards();

        // pending -> completed skips two states
        let err = jobs
            .update_status(&card.id, JobStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::IllegalTransition { .. })
        ));

        let stored = jobs.get_by_id(&card.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert!(stored.started_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_mid_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let invoice = make_invoice(&db, &[(ProductKind::ContactLens, "Monthly Toric")]).await;

        let card = db
            .job_cards()
            .create_for_invoice(&invoice, None, None)
            .await
            .unwrap()
            .unwrap();
        let jobs = db.job_cards();

        jobs.update_status(&card.id, JobStatus::InProgress).await.unwrap();
        let cancelled = jobs.update_status(&card.id, JobStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);

        // Terminal: nothing further is accepted
        assert!(jobs.update_status(&card.id, JobStatus::Completed).await.is_err());
    }
}
