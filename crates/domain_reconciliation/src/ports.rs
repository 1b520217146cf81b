//! Reconciliation Domain Ports
//!
//! The pass reads enrollment and schedule state through `EnrollmentDirectory`
//! and emits through `NotificationSink`. Both are implemented internally by
//! the database layer and mocked for tests; the sink may equally front an
//! external push/messaging system.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, Money, OperationMetadata, PortError, ScheduleItemId, SubjectId};

use crate::notification::NotificationRequest;

/// The reconciliation view of one enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub subject_id: SubjectId,
    /// Last day of the enrollment
    pub end_date: NaiveDate,
    /// Billed by elapsed time rather than installments
    pub usage_metered: bool,
}

/// A pending obligation past its due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueObligation {
    pub subject_id: SubjectId,
    pub item_id: ScheduleItemId,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// Read/transition port over enrollment state
#[async_trait]
pub trait EnrollmentDirectory: DomainPort {
    /// All enrollments currently in active status
    async fn active_enrollments(
        &self,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<EnrollmentRecord>, PortError>;

    /// Pending schedule items strictly past due as of `today`
    async fn overdue_obligations(
        &self,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<OverdueObligation>, PortError>;

    /// Transitions an active enrollment to expired
    async fn mark_expired(
        &self,
        subject_id: SubjectId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

/// Fire-and-forget notification delivery port
#[async_trait]
pub trait NotificationSink: DomainPort {
    /// Hands a notification to the delivery system
    ///
    /// Deduplication by `dedupe_key` is the sink's responsibility; the job
    /// guarantees stable keys per subject, event and calendar day.
    async fn create_notification(
        &self,
        request: NotificationRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of EnrollmentDirectory
    #[derive(Debug, Default)]
    pub struct MockEnrollmentDirectory {
        enrollments: Arc<RwLock<HashMap<SubjectId, EnrollmentRecord>>>,
        overdue: Arc<RwLock<Vec<OverdueObligation>>>,
        expired: Arc<RwLock<Vec<SubjectId>>>,
    }

    impl MockEnrollmentDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_enrollments(enrollments: Vec<EnrollmentRecord>) -> Self {
            let directory = Self::new();
            for record in enrollments {
                directory
                    .enrollments
                    .write()
                    .await
                    .insert(record.subject_id, record);
            }
            directory
        }

        pub async fn add_overdue(&self, obligation: OverdueObligation) {
            self.overdue.write().await.push(obligation);
        }

        /// Subjects transitioned to expired so far
        pub async fn expired_subjects(&self) -> Vec<SubjectId> {
            self.expired.read().await.clone()
        }
    }

    impl DomainPort for MockEnrollmentDirectory {}

    #[async_trait]
    impl EnrollmentDirectory for MockEnrollmentDirectory {
        async fn active_enrollments(
            &self,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<EnrollmentRecord>, PortError> {
            let expired = self.expired.read().await;
            Ok(self
                .enrollments
                .read()
                .await
                .values()
                .filter(|r| !expired.contains(&r.subject_id))
                .cloned()
                .collect())
        }

        async fn overdue_obligations(
            &self,
            today: NaiveDate,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<OverdueObligation>, PortError> {
            Ok(self
                .overdue
                .read()
                .await
                .iter()
                .filter(|o| o.due_date < today)
                .cloned()
                .collect())
        }

        async fn mark_expired(
            &self,
            subject_id: SubjectId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let known = self.enrollments.read().await.contains_key(&subject_id);
            if !known {
                return Err(PortError::not_found("Enrollment", subject_id));
            }
            self.expired.write().await.push(subject_id);
            Ok(())
        }
    }

    /// Notification sink that records every request it receives
    #[derive(Debug, Default)]
    pub struct RecordingNotificationSink {
        requests: Arc<RwLock<Vec<NotificationRequest>>>,
        /// Subjects for which delivery should fail, to exercise isolation
        failing_subjects: Arc<RwLock<Vec<SubjectId>>>,
    }

    impl RecordingNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn fail_for(&self, subject_id: SubjectId) {
            self.failing_subjects.write().await.push(subject_id);
        }

        pub async fn requests(&self) -> Vec<NotificationRequest> {
            self.requests.read().await.clone()
        }
    }

    impl DomainPort for RecordingNotificationSink {}

    #[async_trait]
    impl NotificationSink for RecordingNotificationSink {
        async fn create_notification(
            &self,
            request: NotificationRequest,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            if self
                .failing_subjects
                .read()
                .await
                .contains(&request.subject_id)
            {
                return Err(PortError::ServiceUnavailable {
                    service: "notification-sink".to_string(),
                });
            }
            self.requests.write().await.push(request);
            Ok(())
        }
    }
}
