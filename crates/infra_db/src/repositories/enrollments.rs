//! Enrollment repository
//!
//! Reads enrollment state for the reconciliation pass and the deletion
//! guard, and implements the `EnrollmentDirectory` port so the job can run
//! against the live database.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{
    Currency, DomainPort, Money, OperationMetadata, PlanId, PortError, ScheduleItemId, SubjectId,
};
use domain_enrollment::ObligationSummary;
use domain_reconciliation::{EnrollmentDirectory, EnrollmentRecord, OverdueObligation};

use crate::error::DatabaseError;

/// Repository over subjects and their open obligations
#[derive(Debug, Clone)]
pub struct EnrollmentRepository {
    pool: PgPool,
}

/// Database row for a subject
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectRow {
    pub subject_id: Uuid,
    pub organization_id: Uuid,
    pub program_class: String,
    pub status: String,
    pub usage_metered: bool,
    pub custom_hourly_rate: Option<Decimal>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl EnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches a subject by id
    pub async fn get_subject(&self, subject_id: Uuid) -> Result<SubjectRow, DatabaseError> {
        sqlx::query_as::<_, SubjectRow>(
            r#"
            SELECT subject_id, organization_id, program_class, status,
                   usage_metered, custom_hourly_rate, start_date, end_date
            FROM subjects WHERE subject_id = $1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Subject", subject_id))
    }

    /// Open financial state backing the deletion guard
    pub async fn obligation_summary(
        &self,
        subject_id: Uuid,
        currency: Currency,
    ) -> Result<ObligationSummary, DatabaseError> {
        let active_plan: Option<(Uuid,)> = sqlx::query_as(
            "SELECT plan_id FROM billing_plans WHERE subject_id = $1 AND status = 'active'",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        let (unpaid_items, outstanding): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(si.amount), 0)
            FROM schedule_items si
            JOIN billing_plans bp ON bp.plan_id = si.plan_id
            WHERE bp.subject_id = $1
              AND bp.status <> 'cancelled'
              AND si.status = 'pending'
            "#,
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ObligationSummary {
            active_plan_id: active_plan.map(|(id,)| PlanId::from(id)),
            unpaid_items: unpaid_items as u32,
            outstanding: Money::new(outstanding, currency),
        })
    }

    /// Removes a subject; the caller must have passed the deletion guard
    pub async fn delete_subject(&self, subject_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM subjects WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Subject", subject_id));
        }
        Ok(())
    }
}

fn to_port_error(error: DatabaseError) -> PortError {
    if error.is_not_found() {
        return PortError::not_found("Enrollment", "unknown");
    }
    if error.is_connection_error() {
        return PortError::connection(error.to_string());
    }
    PortError::internal(error.to_string())
}

impl DomainPort for EnrollmentRepository {}

#[async_trait]
impl EnrollmentDirectory for EnrollmentRepository {
    async fn active_enrollments(
        &self,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<EnrollmentRecord>, PortError> {
        let rows: Vec<(Uuid, NaiveDate, bool)> = sqlx::query_as(
            "SELECT subject_id, end_date, usage_metered FROM subjects WHERE status = 'active'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(DatabaseError::from(&e)))?;

        Ok(rows
            .into_iter()
            .map(|(subject_id, end_date, usage_metered)| EnrollmentRecord {
                subject_id: SubjectId::from(subject_id),
                end_date,
                usage_metered,
            })
            .collect())
    }

    async fn overdue_obligations(
        &self,
        today: NaiveDate,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OverdueObligation>, PortError> {
        let rows: Vec<(Uuid, Uuid, NaiveDate, Decimal, String)> = sqlx::query_as(
            r#"
            SELECT bp.subject_id, si.item_id, si.due_date, si.amount, bp.currency
            FROM schedule_items si
            JOIN billing_plans bp ON bp.plan_id = si.plan_id
            WHERE si.status = 'pending'
              AND si.due_date < $1
              AND bp.status = 'active'
            ORDER BY si.due_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(DatabaseError::from(&e)))?;

        Ok(rows
            .into_iter()
            .map(|(subject_id, item_id, due_date, amount, currency)| OverdueObligation {
                subject_id: SubjectId::from(subject_id),
                item_id: ScheduleItemId::from(item_id),
                due_date,
                amount: Money::new(
                    amount,
                    Currency::from_code(&currency).unwrap_or(Currency::USD),
                ),
            })
            .collect())
    }

    async fn mark_expired(
        &self,
        subject_id: SubjectId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE subjects
            SET status = 'expired', updated_at = now()
            WHERE subject_id = $1 AND status = 'active'
            "#,
        )
        .bind(Uuid::from(subject_id))
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(DatabaseError::from(&e)))?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Enrollment", subject_id));
        }
        Ok(())
    }
}
