//! Usage billing calculator
//!
//! Converts attendance duration into metered charges for subjects billed by
//! elapsed time. The monthly charge is the sum of closed-event durations
//! falling in the reporting month, in hours, multiplied by the resolved
//! hourly rate.

use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{Money, ReportingMonth, Timezone};

use crate::attendance::AttendanceEvent;
use crate::error::EnrollmentError;

/// Resolves the hourly rate for a subject
///
/// The subject's custom rate takes precedence; otherwise the organization
/// default applies.
pub fn resolve_hourly_rate(custom: Option<Money>, organization_default: Money) -> Money {
    custom.unwrap_or(organization_default)
}

/// Filters out events that have been superseded by a correction
///
/// A correction carries `corrected_from` pointing at the event it replaces;
/// the replaced event must not be billed again.
pub fn effective_events(events: &[AttendanceEvent]) -> Vec<&AttendanceEvent> {
    let superseded: Vec<_> = events
        .iter()
        .filter_map(|e| e.corrected_from)
        .collect();

    events
        .iter()
        .filter(|e| !superseded.contains(&e.id))
        .collect()
}

/// Computes the metered charge for one reporting month
///
/// Events are bucketed by the local calendar date of their check-in in the
/// organization's timezone. Open events (no check-out yet) are skipped; they
/// bill once closed.
pub fn monthly_charge(
    events: &[AttendanceEvent],
    month: ReportingMonth,
    hourly_rate: Money,
    timezone: &Timezone,
) -> Result<Money, EnrollmentError> {
    let mut total_hours = Decimal::ZERO;

    for event in effective_events(events) {
        if !month.contains(timezone.local_date(event.check_in)) {
            continue;
        }
        if let Some(hours) = event.billable_hours() {
            total_hours += hours;
        }
    }

    debug!(%month, %total_hours, "computed metered hours");

    Ok(hourly_rate.multiply(total_hours).round_to_currency())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use core_kernel::{Currency, SubjectId};
    use rust_decimal_macros::dec;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, h, 0, 0).unwrap()
    }

    fn closed_event(subject: SubjectId, day: u32, from_h: u32, to_h: u32) -> AttendanceEvent {
        let mut event = AttendanceEvent::check_in(subject, at(day, from_h));
        event.close(at(day, to_h)).unwrap();
        event
    }

    #[test]
    fn test_monthly_charge_sums_durations() {
        let subject = SubjectId::new();
        // 3h + 2h at rate 100 -> 500
        let events = vec![
            closed_event(subject, 3, 8, 11),
            closed_event(subject, 10, 9, 11),
        ];

        let charge = monthly_charge(
            &events,
            ReportingMonth::new(2024, 6).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &Timezone::default(),
        )
        .unwrap();

        assert_eq!(charge.amount(), dec!(500));
    }

    #[test]
    fn test_events_outside_month_excluded() {
        let subject = SubjectId::new();
        let events = vec![closed_event(subject, 3, 8, 11)];

        let charge = monthly_charge(
            &events,
            ReportingMonth::new(2024, 7).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &Timezone::default(),
        )
        .unwrap();

        assert!(charge.is_zero());
    }

    #[test]
    fn test_open_events_not_billed() {
        let subject = SubjectId::new();
        let events = vec![AttendanceEvent::check_in(subject, at(3, 8))];

        let charge = monthly_charge(
            &events,
            ReportingMonth::new(2024, 6).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &Timezone::default(),
        )
        .unwrap();

        assert!(charge.is_zero());
    }

    #[test]
    fn test_corrections_supersede_originals() {
        let subject = SubjectId::new();
        let original = closed_event(subject, 3, 8, 16); // 8h, mis-scanned
        let correction =
            AttendanceEvent::correction_of(&original, at(3, 8), at(3, 12)).unwrap(); // 4h

        let charge = monthly_charge(
            &[original, correction],
            ReportingMonth::new(2024, 6).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &Timezone::default(),
        )
        .unwrap();

        assert_eq!(charge.amount(), dec!(400));
    }

    #[test]
    fn test_rate_resolution_prefers_custom() {
        let default = Money::new(dec!(80), Currency::USD);
        let custom = Money::new(dec!(120), Currency::USD);

        assert_eq!(resolve_hourly_rate(Some(custom), default), custom);
        assert_eq!(resolve_hourly_rate(None, default), default);
    }

    #[test]
    fn test_fractional_hours() {
        let subject = SubjectId::new();
        let mut event = AttendanceEvent::check_in(subject, at(5, 8));
        event
            .close(Utc.with_ymd_and_hms(2024, 6, 5, 9, 30, 0).unwrap())
            .unwrap();

        let charge = monthly_charge(
            &[event],
            ReportingMonth::new(2024, 6).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &Timezone::default(),
        )
        .unwrap();

        assert_eq!(charge.amount(), dec!(150));
    }
}
