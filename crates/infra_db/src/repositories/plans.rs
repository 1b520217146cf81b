//! Plan repository
//!
//! Persists billing plans and their schedules. Plan creation is the first
//! of the two serialization points: the duplicate-active check and the
//! insert run in one transaction under the subject's advisory lock, and the
//! partial unique index on active plans backs the check at the storage
//! level.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use domain_billing::{BillingPlan, PlanTerms};

use super::subject_lock_key;
use crate::error::DatabaseError;

/// Repository for billing plans and schedule items
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

/// Database row for a billing plan
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRow {
    pub plan_id: Uuid,
    pub subject_id: Uuid,
    pub organization_id: Uuid,
    pub plan_kind: String,
    pub total_amount: Decimal,
    pub installment_count: i32,
    pub hourly_rate: Option<Decimal>,
    pub committed_hours: Option<Decimal>,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a schedule item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleItemRow {
    pub item_id: Uuid,
    pub plan_id: Uuid,
    pub sequence_number: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: String,
    pub paid_by: Option<Uuid>,
}

impl ScheduleItemRow {
    /// Rehydrates the domain schedule item from the row
    pub fn into_domain(self, currency: core_kernel::Currency) -> domain_billing::ScheduleItem {
        domain_billing::ScheduleItem {
            id: core_kernel::ScheduleItemId::from(self.item_id),
            sequence_number: self.sequence_number as u32,
            due_date: self.due_date,
            amount: core_kernel::Money::new(self.amount, currency),
            status: if self.status == "paid" {
                domain_billing::ScheduleItemStatus::Paid
            } else {
                domain_billing::ScheduleItemStatus::Pending
            },
            paid_by: self.paid_by.map(core_kernel::PaymentId::from),
        }
    }
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a plan and its schedule atomically
    ///
    /// Runs inside one transaction holding the subject's advisory lock, so
    /// two concurrent creates for the same subject serialize: the second
    /// re-checks after the first commits and fails with a duplicate.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEntry` when the subject already has an active plan
    /// (from the in-transaction check, or from the partial unique index if
    /// anything slips past it).
    #[instrument(skip(self, plan), fields(subject = %plan.subject_id()))]
    pub async fn create_plan_with_schedule(
        &self,
        plan: &BillingPlan,
    ) -> Result<(), DatabaseError> {
        let subject_uuid: Uuid = plan.subject_id().into();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(subject_lock_key(subject_uuid))
            .execute(&mut *tx)
            .await?;

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT plan_id FROM billing_plans WHERE subject_id = $1 AND status = 'active'",
        )
        .bind(subject_uuid)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(DatabaseError::duplicate(
                "BillingPlan",
                "active subject",
                plan.subject_id(),
            ));
        }

        let (plan_kind, installment_count, hourly_rate, committed_hours) = match plan.terms() {
            PlanTerms::Installment {
                installment_count, ..
            } => ("installment", *installment_count as i32, None, None),
            PlanTerms::UsageMetered {
                hourly_rate,
                committed_hours,
            } => (
                "usage_metered",
                0,
                Some(hourly_rate.amount()),
                Some(*committed_hours),
            ),
        };

        let total = plan.total_amount();
        sqlx::query(
            r#"
            INSERT INTO billing_plans (
                plan_id, subject_id, organization_id, plan_kind, total_amount,
                installment_count, hourly_rate, committed_hours, currency,
                start_date, end_date, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active')
            "#,
        )
        .bind(Uuid::from(plan.id()))
        .bind(subject_uuid)
        .bind(Uuid::from(plan.organization_id()))
        .bind(plan_kind)
        .bind(total.amount())
        .bind(installment_count)
        .bind(hourly_rate)
        .bind(committed_hours)
        .bind(total.currency().code())
        .bind(plan.period().start())
        .bind(plan.period().end())
        .execute(&mut *tx)
        .await?;

        for item in plan.schedule() {
            sqlx::query(
                r#"
                INSERT INTO schedule_items (
                    item_id, plan_id, sequence_number, due_date, amount, status
                ) VALUES ($1, $2, $3, $4, $5, 'pending')
                "#,
            )
            .bind(Uuid::from(item.id))
            .bind(Uuid::from(plan.id()))
            .bind(item.sequence_number as i32)
            .bind(item.due_date)
            .bind(item.amount.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The subject's active plan, if any
    pub async fn find_active_plan(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<PlanRow>, DatabaseError> {
        let row = sqlx::query_as::<_, PlanRow>(
            "SELECT * FROM billing_plans WHERE subject_id = $1 AND status = 'active'",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The subject's most recent non-cancelled plan, if any
    ///
    /// The aggregator uses its total as the subject-specific expected
    /// amount; a completed plan still defines what the subject owed.
    pub async fn find_current_plan(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<PlanRow>, DatabaseError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT * FROM billing_plans
            WHERE subject_id = $1 AND status <> 'cancelled'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Fetches a plan by id
    pub async fn get_plan(&self, plan_id: Uuid) -> Result<PlanRow, DatabaseError> {
        sqlx::query_as::<_, PlanRow>("SELECT * FROM billing_plans WHERE plan_id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("BillingPlan", plan_id))
    }

    /// Schedule items for a plan, ordered by due date
    pub async fn schedule_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<ScheduleItemRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ScheduleItemRow>(
            "SELECT * FROM schedule_items WHERE plan_id = $1 ORDER BY due_date, sequence_number",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Schedule items across all of a subject's plans, ordered by due date
    pub async fn schedule_for_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<ScheduleItemRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ScheduleItemRow>(
            r#"
            SELECT si.*
            FROM schedule_items si
            JOIN billing_plans bp ON bp.plan_id = si.plan_id
            WHERE bp.subject_id = $1 AND bp.status <> 'cancelled'
            ORDER BY si.due_date, si.sequence_number
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Cancels a plan, refusing while collected money references it
    ///
    /// # Errors
    ///
    /// - `ConstraintViolation` when the plan has paid items or is not active
    /// - `NotFound` when the plan does not exist
    #[instrument(skip(self))]
    pub async fn cancel_plan(&self, plan_id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let plan: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT subject_id, status FROM billing_plans WHERE plan_id = $1 FOR UPDATE",
        )
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (_, status) = plan.ok_or_else(|| DatabaseError::not_found("BillingPlan", plan_id))?;
        if status != "active" {
            return Err(DatabaseError::ConstraintViolation(format!(
                "cannot cancel {status} plan {plan_id}"
            )));
        }

        let (paid_items,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM schedule_items WHERE plan_id = $1 AND status = 'paid'",
        )
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        if paid_items > 0 {
            return Err(DatabaseError::ConstraintViolation(format!(
                "plan {plan_id} has {paid_items} paid item(s); cancellation would discard collected money"
            )));
        }

        sqlx::query(
            "UPDATE billing_plans SET status = 'cancelled', updated_at = now() WHERE plan_id = $1",
        )
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Transitions the plan to completed iff every schedule item is paid
    ///
    /// Returns whether the plan is (now) completed. Safe to call repeatedly;
    /// the guard in the WHERE clause makes the transition a no-op once done.
    pub async fn complete_if_paid(&self, plan_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
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
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let (status,): (String,) =
            sqlx::query_as("SELECT status FROM billing_plans WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DatabaseError::not_found("BillingPlan", plan_id))?;

        Ok(status == "completed")
    }
}
