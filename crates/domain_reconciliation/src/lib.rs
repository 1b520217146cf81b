//! Reconciliation Domain - Scheduled Billing Consistency Pass
//!
//! A periodic pass over enrollment and schedule state that detects expiring
//! enrollments and overdue obligations, emitting fire-and-forget
//! notifications through the sink port.
//!
//! # Idempotency
//!
//! The job may be invoked more than once for the same day. Every emitted
//! notification carries a dedupe key of `{subject_id}:{event}:{date}`, so
//! the external sink can collapse re-runs without notification storms.
//!
//! # Isolation
//!
//! Each subject's check is independent: a failure is recorded in the run
//! report and never aborts the scan, and no lock is held across the pass.

pub mod job;
pub mod notification;
pub mod ports;
pub mod error;

pub use job::{ReconciliationJob, ReconciliationReport, SubjectFailure};
pub use notification::{NotificationPriority, NotificationRequest, ReconciliationEvent};
pub use ports::{EnrollmentDirectory, EnrollmentRecord, NotificationSink, OverdueObligation};
pub use error::ReconciliationError;
