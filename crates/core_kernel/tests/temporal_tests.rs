//! Integration tests for temporal types

use chrono::{NaiveDate, TimeZone, Utc};
use core_kernel::{BillingPeriod, DateRange, ReportingMonth, TemporalError, Timezone};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_billing_period_strict_ordering() {
    assert!(BillingPeriod::new(date(2024, 4, 1), date(2025, 3, 31)).is_ok());
    assert!(BillingPeriod::new(date(2024, 4, 1), date(2024, 4, 1)).is_err());
    assert!(BillingPeriod::new(date(2024, 4, 2), date(2024, 4, 1)).is_err());
}

#[test]
fn test_billing_period_contains_endpoints() {
    let period = BillingPeriod::new(date(2024, 4, 1), date(2025, 3, 31)).unwrap();
    assert!(period.contains(date(2024, 4, 1)));
    assert!(period.contains(date(2025, 3, 31)));
    assert!(!period.contains(date(2025, 4, 1)));
}

#[test]
fn test_date_range_day_count() {
    let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    assert_eq!(range.days(), 30);
}

#[test]
fn test_reporting_month_of_date() {
    let month = ReportingMonth::of(date(2024, 7, 19));
    assert_eq!(month.year(), 2024);
    assert_eq!(month.month(), 7);
    assert_eq!(month.to_string(), "2024-07");
}

#[test]
fn test_reporting_month_leap_february() {
    let feb = ReportingMonth::new(2024, 2).unwrap();
    assert_eq!(feb.last_day(), date(2024, 2, 29));

    let feb = ReportingMonth::new(2023, 2).unwrap();
    assert_eq!(feb.last_day(), date(2023, 2, 28));
}

#[test]
fn test_invalid_month() {
    assert_eq!(
        ReportingMonth::new(2024, 0),
        Err(TemporalError::InvalidMonth(0))
    );
}

#[test]
fn test_timezone_local_conversion() {
    let tz = Timezone::new(chrono_tz::Asia::Kolkata);
    let utc = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let local = tz.to_local(utc);
    assert_eq!(local.time(), chrono::NaiveTime::from_hms_opt(17, 30, 0).unwrap());
}

#[test]
fn test_timezone_day_window() {
    let tz = Timezone::new(chrono_tz::Asia::Dubai);
    let day = date(2024, 6, 1);

    let start = tz.start_of_day(day);
    let end = tz.end_of_day(day);

    assert!(start < end);
    // Dubai is UTC+4, so local midnight is 20:00 UTC the previous day
    assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 31, 20, 0, 0).unwrap());
}
