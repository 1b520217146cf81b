//! Property-test generators
//!
//! Proptest strategies for the domain value types, shared by the
//! invariant suites across crates.

use chrono::NaiveDate;
use proptest::prelude::*;

use core_kernel::{Currency, Money};

/// Positive money amounts, built from minor units to stay exactly
/// representable
pub fn positive_money() -> impl Strategy<Value = Money> {
    (1i64..1_000_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::USD))
}

/// Realistic installment counts
pub fn installment_count() -> impl Strategy<Value = u32> {
    1u32..48u32
}

/// Dates within a reasonable scheduling horizon
pub fn schedule_start_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030i32, 1u32..=12u32, 1u32..=28u32).prop_map(|(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d).expect("day <= 28 is valid in every month")
    })
}
