//! The reconciliation pass
//!
//! Runs on an external cron-style trigger. For each active usage-metered
//! enrollment ending tomorrow it emits one "expiring" notification; for each
//! enrollment already past its end date it transitions the subject to
//! expired and emits one "expired" notification; every overdue obligation
//! gets at most one follow-up per day.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::SubjectId;

use crate::error::ReconciliationError;
use crate::notification::{NotificationPriority, NotificationRequest, ReconciliationEvent};
use crate::ports::{EnrollmentDirectory, EnrollmentRecord, NotificationSink};

/// One subject whose check failed; the scan continued past it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFailure {
    pub subject_id: SubjectId,
    pub message: String,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub expiring_notified: u32,
    pub expired: u32,
    pub overdue_notified: u32,
    pub failures: Vec<SubjectFailure>,
}

/// The periodic billing consistency pass
///
/// Holds no state between runs and no lock across the scan; every subject
/// check is independent and can fail or retry in isolation.
pub struct ReconciliationJob {
    directory: Arc<dyn EnrollmentDirectory>,
    sink: Arc<dyn NotificationSink>,
}

impl ReconciliationJob {
    pub fn new(directory: Arc<dyn EnrollmentDirectory>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { directory, sink }
    }

    /// Runs the pass for the given calendar day
    ///
    /// Invoking it twice for the same day produces notifications with
    /// identical dedupe keys, which the sink collapses.
    ///
    /// # Errors
    ///
    /// Fails only when the enrollment directory itself cannot be read;
    /// per-subject problems land in the report instead.
    pub async fn run(&self, today: NaiveDate) -> Result<ReconciliationReport, ReconciliationError> {
        let enrollments = self
            .directory
            .active_enrollments(None)
            .await
            .map_err(ReconciliationError::Directory)?;

        let mut report = ReconciliationReport::default();
        let tomorrow = today.succ_opt().ok_or_else(|| {
            ReconciliationError::InvalidParameters(format!("no day follows {today}"))
        })?;

        for enrollment in &enrollments {
            if let Err(failure) = self
                .check_enrollment(enrollment, today, tomorrow, &mut report)
                .await
            {
                warn!(subject = %failure.subject_id, error = %failure.message, "enrollment check failed");
                report.failures.push(failure);
            }
        }

        match self.directory.overdue_obligations(today, None).await {
            Ok(obligations) => {
                for obligation in obligations {
                    let request = NotificationRequest::new(
                        obligation.subject_id,
                        ReconciliationEvent::OverdueFollowUp,
                        today,
                        format!(
                            "Installment of {} due {} is outstanding",
                            obligation.amount, obligation.due_date
                        ),
                        NotificationPriority::High,
                    );
                    match self.sink.create_notification(request, None).await {
                        Ok(()) => report.overdue_notified += 1,
                        Err(e) => report.failures.push(SubjectFailure {
                            subject_id: obligation.subject_id,
                            message: e.to_string(),
                        }),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "overdue obligation scan failed");
            }
        }

        info!(
            expiring = report.expiring_notified,
            expired = report.expired,
            overdue = report.overdue_notified,
            failures = report.failures.len(),
            "reconciliation pass finished"
        );

        Ok(report)
    }

    async fn check_enrollment(
        &self,
        enrollment: &EnrollmentRecord,
        today: NaiveDate,
        tomorrow: NaiveDate,
        report: &mut ReconciliationReport,
    ) -> Result<(), SubjectFailure> {
        let subject_id = enrollment.subject_id;
        let fail = |message: String| SubjectFailure {
            subject_id,
            message,
        };

        if enrollment.usage_metered && enrollment.end_date == tomorrow {
            let request = NotificationRequest::new(
                subject_id,
                ReconciliationEvent::Expiring,
                today,
                format!("Enrollment ends tomorrow ({})", enrollment.end_date),
                NotificationPriority::Normal,
            );
            self.sink
                .create_notification(request, None)
                .await
                .map_err(|e| fail(e.to_string()))?;
            report.expiring_notified += 1;
        }

        if enrollment.end_date < today {
            // Transition first; a notification failure is recorded but the
            // expiry itself stands
            self.directory
                .mark_expired(subject_id, None)
                .await
                .map_err(|e| fail(e.to_string()))?;
            report.expired += 1;

            let request = NotificationRequest::new(
                subject_id,
                ReconciliationEvent::Expired,
                today,
                format!("Enrollment ended on {}", enrollment.end_date),
                NotificationPriority::Normal,
            );
            self.sink
                .create_notification(request, None)
                .await
                .map_err(|e| fail(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use core_kernel::{Currency, Money, ScheduleItemId};

    use crate::ports::mock::{MockEnrollmentDirectory, RecordingNotificationSink};
    use crate::ports::OverdueObligation;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn enrollment(end_date: NaiveDate, usage_metered: bool) -> EnrollmentRecord {
        EnrollmentRecord {
            subject_id: SubjectId::new(),
            end_date,
            usage_metered,
        }
    }

    async fn job_with(
        enrollments: Vec<EnrollmentRecord>,
    ) -> (
        Arc<MockEnrollmentDirectory>,
        Arc<RecordingNotificationSink>,
        ReconciliationJob,
    ) {
        let directory = Arc::new(MockEnrollmentDirectory::with_enrollments(enrollments).await);
        let sink = Arc::new(RecordingNotificationSink::new());
        let job = ReconciliationJob::new(directory.clone(), sink.clone());
        (directory, sink, job)
    }

    #[tokio::test]
    async fn test_expiring_tomorrow_notified_once() {
        let today = date(2024, 6, 29);
        let record = enrollment(date(2024, 6, 30), true);
        let subject_id = record.subject_id;

        let (_, sink, job) = job_with(vec![record]).await;
        let report = job.run(today).await.unwrap();

        assert_eq!(report.expiring_notified, 1);
        assert_eq!(report.expired, 0);
        assert!(report.failures.is_empty());

        let requests = sink.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].event, ReconciliationEvent::Expiring);
        assert_eq!(
            requests[0].dedupe_key,
            format!("{}:expiring:2024-06-29", subject_id)
        );
    }

    #[tokio::test]
    async fn test_installment_enrollments_do_not_get_expiring_notice() {
        let today = date(2024, 6, 29);
        let (_, sink, job) = job_with(vec![enrollment(date(2024, 6, 30), false)]).await;

        let report = job.run(today).await.unwrap();
        assert_eq!(report.expiring_notified, 0);
        assert!(sink.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_past_end_date_transitions_and_notifies() {
        let today = date(2024, 7, 1);
        let record = enrollment(date(2024, 6, 30), true);
        let subject_id = record.subject_id;

        let (directory, sink, job) = job_with(vec![record]).await;
        let report = job.run(today).await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(directory.expired_subjects().await, vec![subject_id]);

        let requests = sink.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].event, ReconciliationEvent::Expired);
    }

    #[tokio::test]
    async fn test_rerun_same_day_produces_identical_dedupe_keys() {
        let today = date(2024, 6, 29);
        let record = enrollment(date(2024, 6, 30), true);

        let (_, sink, job) = job_with(vec![record]).await;
        job.run(today).await.unwrap();
        job.run(today).await.unwrap();

        let requests = sink.requests().await;
        assert_eq!(requests.len(), 2);
        // Same key both times: the sink collapses the storm
        assert_eq!(requests[0].dedupe_key, requests[1].dedupe_key);
    }

    #[tokio::test]
    async fn test_overdue_obligations_notified() {
        let today = date(2024, 5, 2);
        let subject_id = SubjectId::new();

        let (directory, sink, job) = job_with(vec![]).await;
        directory
            .add_overdue(OverdueObligation {
                subject_id,
                item_id: ScheduleItemId::new(),
                due_date: date(2024, 5, 1),
                amount: Money::new(dec!(1000), Currency::USD),
            })
            .await;

        let report = job.run(today).await.unwrap();
        assert_eq!(report.overdue_notified, 1);

        let requests = sink.requests().await;
        assert_eq!(requests[0].event, ReconciliationEvent::OverdueFollowUp);
        assert_eq!(
            requests[0].dedupe_key,
            format!("{}:overdue_follow_up:2024-05-02", subject_id)
        );
    }

    #[tokio::test]
    async fn test_due_today_is_not_overdue() {
        let today = date(2024, 5, 1);
        let (directory, _, job) = job_with(vec![]).await;
        directory
            .add_overdue(OverdueObligation {
                subject_id: SubjectId::new(),
                item_id: ScheduleItemId::new(),
                due_date: date(2024, 5, 1),
                amount: Money::new(dec!(1000), Currency::USD),
            })
            .await;

        let report = job.run(today).await.unwrap();
        assert_eq!(report.overdue_notified, 0);
    }

    #[tokio::test]
    async fn test_one_subject_failure_does_not_abort_scan() {
        let today = date(2024, 6, 29);
        let failing = enrollment(date(2024, 6, 30), true);
        let healthy = enrollment(date(2024, 6, 30), true);
        let failing_id = failing.subject_id;
        let healthy_id = healthy.subject_id;

        let directory =
            Arc::new(MockEnrollmentDirectory::with_enrollments(vec![failing, healthy]).await);
        let sink = Arc::new(RecordingNotificationSink::new());
        sink.fail_for(failing_id).await;
        let job = ReconciliationJob::new(directory, sink.clone());

        let report = job.run(today).await.unwrap();

        assert_eq!(report.expiring_notified, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject_id, failing_id);

        let requests = sink.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].subject_id, healthy_id);
    }

    #[tokio::test]
    async fn test_empty_directory_is_a_clean_run() {
        let (_, sink, job) = job_with(vec![]).await;
        let report = job.run(date(2024, 6, 29)).await.unwrap();

        assert_eq!(report, ReconciliationReport::default());
        assert!(sink.requests().await.is_empty());
    }
}
