//! Common test fixtures
//!
//! Stable, representative values for tests that do not care about the
//! specific data, only that it is well-formed.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{Currency, DateRange, Money, OrganizationId, SubjectId};

/// The shared test organization
///
/// One organization id reused across a test run keeps multi-fixture setups
/// consistent without threading the id through every helper.
pub static TEST_ORGANIZATION: Lazy<OrganizationId> = Lazy::new(OrganizationId::new);

/// Monetary fixtures
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The standard annual tuition used by plan scenarios
    pub fn annual_tuition() -> Money {
        Money::new(dec!(6000), Currency::USD)
    }

    /// One monthly installment of the standard tuition
    pub fn monthly_installment() -> Money {
        Money::new(dec!(1000), Currency::USD)
    }

    /// The standard registration fee
    pub fn registration_fee() -> Money {
        Money::new(dec!(250), Currency::USD)
    }

    /// The standard daycare hourly rate
    pub fn hourly_rate() -> Money {
        Money::new(dec!(100), Currency::USD)
    }

    pub fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }
}

/// Temporal fixtures
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Academic term start (April 1st)
    pub fn term_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).expect("fixture date is valid")
    }

    /// Academic term end (March 31st next year)
    pub fn term_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).expect("fixture date is valid")
    }

    /// The full academic term
    pub fn term() -> DateRange {
        DateRange::new(Self::term_start(), Self::term_end()).expect("fixture range is valid")
    }

    /// A reporting date early in the term
    pub fn early_report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).expect("fixture date is valid")
    }
}

/// Identifier fixtures
pub struct IdFixtures;

impl IdFixtures {
    pub fn organization_id() -> OrganizationId {
        *TEST_ORGANIZATION
    }

    pub fn subject_id() -> SubjectId {
        SubjectId::new_v7()
    }
}

/// String fixtures
pub struct StringFixtures;

impl StringFixtures {
    pub fn program_class() -> &'static str {
        "grade-5"
    }

    pub fn daycare_class() -> &'static str {
        "daycare-toddler"
    }

    pub fn receipt_prefix() -> &'static str {
        "SPS"
    }

    pub fn academic_year() -> &'static str {
        "2024-25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_fixture_is_stable() {
        assert_eq!(IdFixtures::organization_id(), IdFixtures::organization_id());
    }

    #[test]
    fn test_tuition_splits_into_installments() {
        let parts = MoneyFixtures::annual_tuition().split_last_remainder(6).unwrap();
        assert!(parts.iter().all(|p| *p == MoneyFixtures::monthly_installment()));
    }
}
