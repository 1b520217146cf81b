//! Notification requests emitted by the reconciliation pass

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::SubjectId;

/// What the reconciliation pass observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationEvent {
    /// Enrollment ends tomorrow
    Expiring,
    /// Enrollment end date has passed; subject transitioned to expired
    Expired,
    /// A schedule item or follow-up is past due
    OverdueFollowUp,
}

impl ReconciliationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationEvent::Expiring => "expiring",
            ReconciliationEvent::Expired => "expired",
            ReconciliationEvent::OverdueFollowUp => "overdue_follow_up",
        }
    }
}

/// Notification delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Normal,
    High,
}

/// A fire-and-forget notification handed to the sink
///
/// The dedupe key identifies one occurrence per subject, event and calendar
/// day; the sink uses it to collapse repeated runs of the same day's pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub subject_id: SubjectId,
    pub event: ReconciliationEvent,
    pub message: String,
    pub priority: NotificationPriority,
    pub dedupe_key: String,
}

impl NotificationRequest {
    pub fn new(
        subject_id: SubjectId,
        event: ReconciliationEvent,
        occurred_on: NaiveDate,
        message: impl Into<String>,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            subject_id,
            event,
            message: message.into(),
            priority,
            dedupe_key: format!("{}:{}:{}", subject_id, event.as_str(), occurred_on),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_key_shape() {
        let subject_id = SubjectId::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let request = NotificationRequest::new(
            subject_id,
            ReconciliationEvent::Expiring,
            date,
            "Enrollment ends tomorrow",
            NotificationPriority::Normal,
        );

        assert_eq!(
            request.dedupe_key,
            format!("{}:expiring:2024-06-30", subject_id)
        );
    }

    #[test]
    fn test_same_day_same_event_same_key() {
        let subject_id = SubjectId::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let a = NotificationRequest::new(
            subject_id,
            ReconciliationEvent::OverdueFollowUp,
            date,
            "first run",
            NotificationPriority::High,
        );
        let b = NotificationRequest::new(
            subject_id,
            ReconciliationEvent::OverdueFollowUp,
            date,
            "second run",
            NotificationPriority::High,
        );

        assert_eq!(a.dedupe_key, b.dedupe_key);
    }
}
