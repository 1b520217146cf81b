//! Enrollment domain errors

use chrono::{DateTime, Utc};
use core_kernel::{Money, MoneyError, PlanId, SubjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable detail for the deletion guard
///
/// Carried inside [`EnrollmentError::ActiveFinancialObligations`] so callers
/// can present a specific remediation instead of a generic failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationDetail {
    /// Subject that cannot be removed
    pub subject_id: SubjectId,
    /// Plan still in active status, if any
    pub active_plan_id: Option<PlanId>,
    /// Number of schedule items still pending
    pub unpaid_items: u32,
    /// Total amount outstanding across pending items
    pub outstanding: Money,
}

impl fmt::Display for ObligationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subject {} has {} unpaid item(s) totalling {}",
            self.subject_id, self.unpaid_items, self.outstanding
        )?;
        if let Some(plan_id) = &self.active_plan_id {
            write!(f, " under active plan {}", plan_id)?;
        }
        Ok(())
    }
}

/// Errors that can occur in the enrollment domain
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// Check-out precedes check-in
    #[error("Invalid attendance window: check-out {check_out} precedes check-in {check_in}")]
    InvalidAttendanceWindow {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },

    /// Subject removal blocked while money is still owed or a plan is open
    #[error("Active financial obligations: {0}")]
    ActiveFinancialObligations(ObligationDetail),

    /// Lifecycle transition not allowed from the current status
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Attendance event referenced but not found
    #[error("Attendance event not found: {0}")]
    AttendanceNotFound(String),

    /// Monetary calculation failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}
