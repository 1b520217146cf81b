//! Attendance repository
//!
//! Persists check-in/check-out events for usage-metered subjects. Window
//! validation runs through the domain type before any write, with the table
//! CHECK constraint as backstop.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{AttendanceId, SubjectId};
use domain_enrollment::AttendanceEvent;

use crate::error::DatabaseError;

/// Repository for attendance events
#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

/// Database row for an attendance event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub attendance_id: Uuid,
    pub subject_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub corrected_from: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

impl AttendanceRow {
    /// Rehydrates the domain event from the row
    pub fn into_event(self) -> AttendanceEvent {
        AttendanceEvent {
            id: AttendanceId::from(self.attendance_id),
            subject_id: SubjectId::from(self.subject_id),
            check_in: self.check_in,
            check_out: self.check_out,
            corrected_from: self.corrected_from.map(AttendanceId::from),
            recorded_at: self.recorded_at,
        }
    }
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches an event by id
    pub async fn get_event(&self, attendance_id: Uuid) -> Result<AttendanceRow, DatabaseError> {
        sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_events WHERE attendance_id = $1",
        )
        .bind(attendance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("AttendanceEvent", attendance_id))
    }

    /// Opens an event at check-in time
    pub async fn check_in(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRow, DatabaseError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance_events (attendance_id, subject_id, check_in)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(subject_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Completes an open event at check-out time
    ///
    /// The window is validated by the domain event before the write, so a
    /// check-out preceding check-in or a second close never reaches SQL.
    pub async fn check_out(
        &self,
        attendance_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<AttendanceRow, DatabaseError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_events WHERE attendance_id = $1",
        )
        .bind(attendance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("AttendanceEvent", attendance_id))?;

        let mut event = row.into_event();
        event
            .close(at)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

        let updated = sqlx::query_as::<_, AttendanceRow>(
            r#"
            UPDATE attendance_events
            SET check_out = $2
            WHERE attendance_id = $1 AND check_out IS NULL
            RETURNING *
            "#,
        )
        .bind(attendance_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            DatabaseError::ConstraintViolation(format!(
                "attendance event {attendance_id} is already closed"
            ))
        })?;

        Ok(updated)
    }

    /// Records a correction event replacing a closed one
    pub async fn record_correction(
        &self,
        original_id: Uuid,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<AttendanceRow, DatabaseError> {
        let original = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_events WHERE attendance_id = $1",
        )
        .bind(original_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("AttendanceEvent", original_id))?;

        let correction = AttendanceEvent::correction_of(&original.into_event(), check_in, check_out)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance_events (
                attendance_id, subject_id, check_in, check_out, corrected_from
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::from(correction.id))
        .bind(Uuid::from(correction.subject_id))
        .bind(correction.check_in)
        .bind(correction.check_out)
        .bind(original_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Events for a subject whose check-in falls inside the UTC window
    ///
    /// The caller widens the window by a day on each side and buckets by
    /// organization-local date; the query only narrows the scan.
    pub async fn events_in_window(
        &self,
        subject_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT * FROM attendance_events
            WHERE subject_id = $1 AND check_in >= $2 AND check_in <= $3
            ORDER BY check_in
            "#,
        )
        .bind(subject_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Widened UTC scan window for a reporting month
///
/// A day of slack on each side covers every timezone the organization may
/// be configured with; exact bucketing happens against local dates.
pub fn month_scan_window(
    first_day: NaiveDate,
    last_day: NaiveDate,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = first_day
        .pred_opt()
        .unwrap_or(first_day)
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    let to = last_day
        .succ_opt()
        .unwrap_or(last_day)
        .and_hms_opt(23, 59, 59)
        .expect("end of day is always valid")
        .and_utc();
    (from, to)
}
