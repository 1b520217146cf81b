//! Enrollment and attendance DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use infra_db::AttendanceRow;

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub subject_id: Uuid,
    /// Defaults to now
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    /// Defaults to now
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub check_in: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_from: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billable_hours: Option<Decimal>,
}

impl From<AttendanceRow> for AttendanceResponse {
    fn from(row: AttendanceRow) -> Self {
        let event = row.clone().into_event();
        Self {
            id: row.attendance_id,
            subject_id: row.subject_id,
            check_in: row.check_in,
            check_out: row.check_out,
            corrected_from: row.corrected_from,
            billable_hours: event.billable_hours(),
        }
    }
}
