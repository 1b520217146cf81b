//! Attendance events for usage-metered subjects
//!
//! An event is opened at check-in and completed at check-out. Durations are
//! always derived from the two instants, never stored, so a closed event
//! cannot drift. Retroactive edits go through an explicit correction event
//! that links back to the original.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AttendanceId, SubjectId};

use crate::error::EnrollmentError;

/// A single check-in / check-out pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Unique identifier
    pub id: AttendanceId,
    /// Subject who attended
    pub subject_id: SubjectId,
    /// Check-in instant
    pub check_in: DateTime<Utc>,
    /// Check-out instant; None while the subject is still present
    pub check_out: Option<DateTime<Utc>>,
    /// Original event this one corrects, if any
    pub corrected_from: Option<AttendanceId>,
    /// When the event was recorded
    pub recorded_at: DateTime<Utc>,
}

impl AttendanceEvent {
    /// Opens a new event at check-in time
    pub fn check_in(subject_id: SubjectId, at: DateTime<Utc>) -> Self {
        Self {
            id: AttendanceId::new_v7(),
            subject_id,
            check_in: at,
            check_out: None,
            corrected_from: None,
            recorded_at: Utc::now(),
        }
    }

    /// Completes the event at check-out time
    ///
    /// # Errors
    ///
    /// - `InvalidAttendanceWindow` if check-out precedes check-in
    /// - `InvalidStateTransition` if the event is already closed
    pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), EnrollmentError> {
        if self.check_out.is_some() {
            return Err(EnrollmentError::InvalidStateTransition {
                from: "closed".to_string(),
                to: "closed".to_string(),
            });
        }
        if at < self.check_in {
            return Err(EnrollmentError::InvalidAttendanceWindow {
                check_in: self.check_in,
                check_out: at,
            });
        }
        self.check_out = Some(at);
        Ok(())
    }

    /// Creates a correction replacing a closed event
    ///
    /// The correction is a fresh event carrying the corrected window and a
    /// link to the original; the original is never mutated.
    pub fn correction_of(
        original: &AttendanceEvent,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        if check_out < check_in {
            return Err(EnrollmentError::InvalidAttendanceWindow { check_in, check_out });
        }
        Ok(Self {
            id: AttendanceId::new_v7(),
            subject_id: original.subject_id,
            check_in,
            check_out: Some(check_out),
            corrected_from: Some(original.id),
            recorded_at: Utc::now(),
        })
    }

    /// True once the subject has checked out
    pub fn is_closed(&self) -> bool {
        self.check_out.is_some()
    }

    /// Elapsed time between check-in and check-out; None while open
    ///
    /// Never negative: the window is validated at close time.
    pub fn duration(&self) -> Option<Duration> {
        self.check_out.map(|out| out - self.check_in)
    }

    /// Duration expressed in hours as an exact decimal; None while open
    pub fn billable_hours(&self) -> Option<Decimal> {
        self.duration()
            .map(|d| Decimal::from(d.num_minutes()) / Decimal::from(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, h, m, 0).unwrap()
    }

    #[test]
    fn test_check_in_opens_event() {
        let event = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        assert!(!event.is_closed());
        assert!(event.duration().is_none());
    }

    #[test]
    fn test_close_derives_duration() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        event.close(at(11, 0)).unwrap();

        assert!(event.is_closed());
        assert_eq!(event.duration(), Some(Duration::hours(3)));
        assert_eq!(event.billable_hours(), Some(Decimal::from(3)));
    }

    #[test]
    fn test_close_before_check_in_rejected() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(9, 0));
        let err = event.close(at(8, 59)).unwrap_err();
        assert!(matches!(err, EnrollmentError::InvalidAttendanceWindow { .. }));
        assert!(!event.is_closed());
    }

    #[test]
    fn test_double_close_rejected() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        event.close(at(10, 0)).unwrap();
        assert!(matches!(
            event.close(at(11, 0)),
            Err(EnrollmentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_partial_hours() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        event.close(at(9, 30)).unwrap();
        assert_eq!(event.billable_hours(), Some(Decimal::new(15, 1))); // 1.5
    }

    #[test]
    fn test_correction_links_original() {
        let mut original = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        original.close(at(16, 0)).unwrap();

        let corrected =
            AttendanceEvent::correction_of(&original, at(8, 0), at(12, 0)).unwrap();
        assert_eq!(corrected.corrected_from, Some(original.id));
        assert_eq!(corrected.billable_hours(), Some(Decimal::from(4)));
        // Original remains untouched
        assert_eq!(original.duration(), Some(Duration::hours(8)));
    }

    #[test]
    fn test_correction_validates_window() {
        let mut original = AttendanceEvent::check_in(SubjectId::new(), at(8, 0));
        original.close(at(16, 0)).unwrap();

        assert!(matches!(
            AttendanceEvent::correction_of(&original, at(12, 0), at(8, 0)),
            Err(EnrollmentError::InvalidAttendanceWindow { .. })
        ));
    }
}
