//! Custom assertions
//!
//! Domain-aware assertion helpers that produce readable failure messages.

use core_kernel::Money;
use domain_billing::{FinancialSnapshot, PaymentStanding, ScheduleItem};

/// Asserts that two money values are equal, printing both on failure
pub fn assert_money_eq(actual: Money, expected: Money) {
    assert_eq!(
        actual, expected,
        "expected {expected}, got {actual}"
    );
}

/// Asserts that schedule amounts sum exactly to the plan total
pub fn assert_schedule_sums_to(items: &[ScheduleItem], total: Money) {
    let sum = items
        .iter()
        .fold(Money::zero(total.currency()), |acc, i| acc + i.amount);
    assert_eq!(
        sum, total,
        "schedule sums to {sum}, expected {total} across {} items",
        items.len()
    );
}

/// Asserts the derived standing of a snapshot
pub fn assert_standing(snapshot: &FinancialSnapshot, expected: PaymentStanding) {
    assert_eq!(
        snapshot.status, expected,
        "expected standing {:?}, got {:?} (due {}, overdue {})",
        expected, snapshot.status, snapshot.total_due, snapshot.overdue_count
    );
}
