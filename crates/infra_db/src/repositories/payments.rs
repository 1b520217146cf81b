//! Payment repository
//!
//! Records payments and applies them to schedule items. This is the second
//! serialization point: the item check, the insert and the completion
//! re-check run in one transaction under the subject's advisory lock.
//!
//! Receipt issuance is a single persist-if-absent UPDATE deriving the
//! number from the payment's own sequence, so retries and concurrent calls
//! can only ever write the value they would read.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::subject_lock_key;
use crate::error::DatabaseError;

/// Repository for the payment ledger
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub payment_seq: i64,
    pub subject_id: Uuid,
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub discount: Option<Decimal>,
    pub currency: String,
    pub paid_on: NaiveDate,
    pub mode: String,
    pub category: String,
    pub schedule_item_id: Option<Uuid>,
    pub transaction_ref: Option<Uuid>,
    pub receipt_no: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    /// Rehydrates the domain payment from the row
    pub fn into_domain(self, currency: core_kernel::Currency) -> domain_billing::Payment {
        domain_billing::Payment {
            id: core_kernel::PaymentId::from(self.payment_id),
            subject_id: core_kernel::SubjectId::from(self.subject_id),
            amount: core_kernel::Money::new(self.amount, currency),
            discount: self.discount.map(|d| core_kernel::Money::new(d, currency)),
            paid_on: self.paid_on,
            mode: domain_billing::PaymentMode::parse(&self.mode)
                .unwrap_or(domain_billing::PaymentMode::Cash),
            category: domain_billing::ChargeCategory::parse(&self.category)
                .unwrap_or(domain_billing::ChargeCategory::AdditionalCharge),
            schedule_item_id: self.schedule_item_id.map(core_kernel::ScheduleItemId::from),
            transaction_id: self.transaction_ref.map(core_kernel::TransactionId::from),
            receipt_no: self.receipt_no,
            status: if self.status == "completed" {
                domain_billing::PaymentStatus::Completed
            } else {
                domain_billing::PaymentStatus::Pending
            },
            ledger_seq: Some(self.payment_seq as u64),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// Data for recording a new payment
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub subject_id: Uuid,
    pub organization_id: Uuid,
    pub amount: Decimal,
    pub discount: Option<Decimal>,
    pub currency: String,
    pub paid_on: NaiveDate,
    pub mode: String,
    pub category: String,
    pub schedule_item_id: Option<Uuid>,
    pub transaction_ref: Option<Uuid>,
    /// Counter payments settle immediately; gateway payments stay pending
    pub completed: bool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a payment, settling its schedule item when referenced
    ///
    /// When a schedule item is given, the item row is locked, the amount
    /// must cover it exactly (a schedule item is atomic; partial coverage
    /// belongs in a separate unscheduled payment), and the owning plan's
    /// completion is re-checked before commit.
    ///
    /// # Errors
    ///
    /// - `ConstraintViolation` on non-positive amounts, an already-paid
    ///   item, or an amount that does not settle the item exactly
    /// - `NotFound` when the referenced schedule item does not exist
    #[instrument(skip(self, new), fields(subject = %new.subject_id))]
    pub async fn record_payment(&self, new: NewPayment) -> Result<PaymentRow, DatabaseError> {
        if new.amount <= Decimal::ZERO {
            return Err(DatabaseError::ConstraintViolation(format!(
                "payment amount must be positive, got {}",
                new.amount
            )));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(subject_lock_key(new.subject_id))
            .execute(&mut *tx)
            .await?;

        let mut settled_plan: Option<Uuid> = None;
        if let Some(item_id) = new.schedule_item_id {
            let item: Option<(Uuid, Decimal, String)> = sqlx::query_as(
                "SELECT plan_id, amount, status FROM schedule_items WHERE item_id = $1 FOR UPDATE",
            )
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (plan_id, amount, status) =
                item.ok_or_else(|| DatabaseError::not_found("ScheduleItem", item_id))?;

            if status == "paid" {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "schedule item {item_id} is already paid"
                )));
            }
            if amount != new.amount {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "payment of {} does not settle schedule item {item_id} amount {} exactly",
                    new.amount, amount
                )));
            }

            settled_plan = Some(plan_id);
        }

        let payment_id = Uuid::now_v7();
        let completed_at = new.completed.then(Utc::now);
        let status = if new.completed { "completed" } else { "pending" };

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (
                payment_id, subject_id, organization_id, amount, discount,
                currency, paid_on, mode, category, schedule_item_id,
                transaction_ref, status, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(new.subject_id)
        .bind(new.organization_id)
        .bind(new.amount)
        .bind(new.discount)
        .bind(&new.currency)
        .bind(new.paid_on)
        .bind(&new.mode)
        .bind(&new.category)
        .bind(new.schedule_item_id)
        .bind(new.transaction_ref)
        .bind(status)
        .bind(completed_at)
        .fetch_one(&mut *tx)
        .await?;

        if let (Some(item_id), Some(plan_id)) = (new.schedule_item_id, settled_plan) {
            sqlx::query(
                "UPDATE schedule_items SET status = 'paid', paid_by = $1 WHERE item_id = $2",
            )
            .bind(payment_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

            // Completion is re-evaluated after every payment referencing the plan
            sqlx::query(
                r#"
                UPDATE billing_plans
                SET status = 'completed', updated_at = now()
                WHERE plan_id = $1
                  AND status = 'active'
                  AND NOT EXISTS (
                      SELECT 1 FROM schedule_items
                      WHERE plan_id = $1 AND status = 'pending'
                  )
                "#,
            )
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Issues (or re-reads) the receipt number for a payment
    ///
    /// Idempotent by construction: the number is a pure function of the
    /// payment's persisted sequence, and the UPDATE only fires while the
    /// column is NULL.
    pub async fn issue_receipt(
        &self,
        payment_id: Uuid,
        organization_prefix: &str,
        academic_year: &str,
    ) -> Result<String, DatabaseError> {
        sqlx::query(
            r#"
            UPDATE payments
            SET receipt_no = $2 || '/' || $3 || '/' || lpad(payment_seq::text, 6, '0')
            WHERE payment_id = $1 AND receipt_no IS NULL
            "#,
        )
        .bind(payment_id)
        .bind(organization_prefix)
        .bind(academic_year)
        .execute(&self.pool)
        .await?;

        let receipt: Option<(Option<String>,)> =
            sqlx::query_as("SELECT receipt_no FROM payments WHERE payment_id = $1")
                .bind(payment_id)
                .fetch_optional(&self.pool)
                .await?;

        receipt
            .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))?
            .0
            .ok_or_else(|| {
                DatabaseError::QueryFailed(format!("receipt derivation failed for {payment_id}"))
            })
    }

    /// Backfill sweep: numbers every receipt-less payment of an organization
    ///
    /// Safe to run repeatedly and concurrently with live traffic; already
    /// numbered payments are untouched. Returns how many were backfilled.
    #[instrument(skip(self))]
    pub async fn backfill_missing_receipts(
        &self,
        organization_id: Uuid,
        organization_prefix: &str,
        academic_year: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET receipt_no = $2 || '/' || $3 || '/' || lpad(payment_seq::text, 6, '0')
            WHERE organization_id = $1 AND receipt_no IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(organization_prefix)
        .bind(academic_year)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Fetches a payment by id
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentRow, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))
    }

    /// Transitions a pending payment to completed
    pub async fn complete_payment(&self, payment_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'completed', completed_at = now()
            WHERE payment_id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either missing or already completed; only the former is an error
            self.get_payment(payment_id).await?;
        }
        Ok(())
    }

    /// Completed payments for a subject, in ledger order
    pub async fn completed_for_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT * FROM payments
            WHERE subject_id = $1 AND status = 'completed'
            ORDER BY payment_seq
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
