//! Enrollment Domain - Subjects and Attendance
//!
//! This crate models the billable entities of the platform: students on
//! installment plans and daycare children billed by elapsed attendance time.
//!
//! # Responsibilities
//!
//! - Subject lifecycle (enrolled, active, expired) and the deletion guard
//!   that blocks removal while financial obligations are open
//! - Attendance events (check-in / check-out) with validated time windows
//! - The usage billing calculator that converts attendance duration into
//!   metered monthly charges

pub mod subject;
pub mod attendance;
pub mod usage;
pub mod error;

pub use subject::{
    ensure_no_financial_obligations, BillingArrangement, ObligationSummary, Subject, SubjectStatus,
};
pub use attendance::AttendanceEvent;
pub use usage::{effective_events, monthly_charge, resolve_hourly_rate};
pub use error::{EnrollmentError, ObligationDetail};
