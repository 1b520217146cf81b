//! Comprehensive tests for domain_enrollment

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, DateRange, Money, OrganizationId, PlanId, ReportingMonth, SubjectId, Timezone};
use domain_enrollment::{
    monthly_charge, resolve_hourly_rate, AttendanceEvent, EnrollmentError, ObligationSummary,
    Subject, SubjectStatus,
};

fn period() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    )
    .unwrap()
}

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, h, m, 0).unwrap()
}

mod subject_tests {
    use super::*;

    #[test]
    fn test_expire_from_active() {
        let mut subject =
            Subject::enroll_usage_metered(OrganizationId::new(), "daycare", period(), None);
        subject.activate().unwrap();
        subject.expire().unwrap();
        assert_eq!(subject.status(), SubjectStatus::Expired);
    }

    #[test]
    fn test_past_end_detection() {
        let subject = Subject::enroll_installment(OrganizationId::new(), "grade-1", period());
        assert!(!subject.is_past_end(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()));
        assert!(subject.is_past_end(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
    }

    #[test]
    fn test_obligation_summary_clear() {
        let summary = ObligationSummary {
            active_plan_id: None,
            unpaid_items: 0,
            outstanding: Money::zero(Currency::USD),
        };
        assert!(summary.is_clear());
    }

    #[test]
    fn test_obligation_summary_outstanding_blocks() {
        let summary = ObligationSummary {
            active_plan_id: None,
            unpaid_items: 0,
            outstanding: Money::new(dec!(0.01), Currency::USD),
        };
        assert!(!summary.is_clear());
    }

    #[test]
    fn test_deletion_guard_detail_is_machine_readable() {
        let subject = Subject::enroll_installment(OrganizationId::new(), "grade-1", period());
        let plan_id = PlanId::new();
        let err = subject
            .ensure_no_financial_obligations(&ObligationSummary {
                active_plan_id: Some(plan_id),
                unpaid_items: 2,
                outstanding: Money::new(dec!(2000), Currency::USD),
            })
            .unwrap_err();

        let EnrollmentError::ActiveFinancialObligations(detail) = err else {
            panic!("expected obligations error");
        };
        assert_eq!(detail.active_plan_id, Some(plan_id));
        assert_eq!(detail.unpaid_items, 2);
        assert_eq!(detail.outstanding.amount(), dec!(2000));

        // Detail round-trips through JSON for API consumers
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("unpaid_items"));
    }
}

mod attendance_tests {
    use super::*;

    #[test]
    fn test_checkout_before_checkin_always_fails() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(3, 9, 0));
        let result = event.close(at(3, 8, 59));
        assert!(matches!(
            result,
            Err(EnrollmentError::InvalidAttendanceWindow { .. })
        ));
    }

    #[test]
    fn test_zero_length_visit_is_valid() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(3, 9, 0));
        event.close(at(3, 9, 0)).unwrap();
        assert_eq!(event.billable_hours(), Some(dec!(0)));
    }

    #[test]
    fn test_duration_never_negative() {
        let mut event = AttendanceEvent::check_in(SubjectId::new(), at(3, 9, 0));
        event.close(at(3, 17, 30)).unwrap();
        let hours = event.billable_hours().unwrap();
        assert!(hours >= dec!(0));
        assert_eq!(hours, dec!(8.5));
    }
}

mod usage_tests {
    use super::*;

    /// Daycare scenario: hourly rate 100, attendance of 3h and 2h in the month
    #[test]
    fn test_monthly_usage_charge_scenario() {
        let subject = SubjectId::new();

        let mut first = AttendanceEvent::check_in(subject, at(4, 8, 0));
        first.close(at(4, 11, 0)).unwrap();
        let mut second = AttendanceEvent::check_in(subject, at(18, 13, 0));
        second.close(at(18, 15, 0)).unwrap();

        let rate = resolve_hourly_rate(None, Money::new(dec!(100), Currency::USD));
        let charge = monthly_charge(
            &[first, second],
            ReportingMonth::new(2024, 6).unwrap(),
            rate,
            &Timezone::default(),
        )
        .unwrap();

        assert_eq!(charge.amount(), dec!(500));
    }

    #[test]
    fn test_custom_rate_overrides_default() {
        let subject = SubjectId::new();
        let mut event = AttendanceEvent::check_in(subject, at(4, 8, 0));
        event.close(at(4, 10, 0)).unwrap();

        let rate = resolve_hourly_rate(
            Some(Money::new(dec!(150), Currency::USD)),
            Money::new(dec!(100), Currency::USD),
        );
        let charge = monthly_charge(
            &[event],
            ReportingMonth::new(2024, 6).unwrap(),
            rate,
            &Timezone::default(),
        )
        .unwrap();

        assert_eq!(charge.amount(), dec!(300));
    }

    #[test]
    fn test_timezone_buckets_check_in_date() {
        let subject = SubjectId::new();
        // 20:00 UTC on May 31 is already June 1 in Dubai (+04:00)
        let mut event = AttendanceEvent::check_in(
            subject,
            Utc.with_ymd_and_hms(2024, 5, 31, 20, 0, 0).unwrap(),
        );
        event
            .close(Utc.with_ymd_and_hms(2024, 5, 31, 22, 0, 0).unwrap())
            .unwrap();

        let tz = Timezone::new(chrono_tz::Asia::Dubai);
        let june = monthly_charge(
            &[event.clone()],
            ReportingMonth::new(2024, 6).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &tz,
        )
        .unwrap();
        assert_eq!(june.amount(), dec!(200));

        let may = monthly_charge(
            &[event],
            ReportingMonth::new(2024, 5).unwrap(),
            Money::new(dec!(100), Currency::USD),
            &tz,
        )
        .unwrap();
        assert!(may.is_zero());
    }
}
