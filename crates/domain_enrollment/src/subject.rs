//! Subject entity - the billable student or daycare child
//!
//! A Subject is scoped to exactly one organization and carries its billing
//! arrangement: fixed installments or usage-metered hourly billing.
//!
//! # Invariants
//!
//! - A subject is never deleted while financial obligations are open
//! - Status transitions follow Enrolled -> Active -> Expired
//! - Usage-metered subjects may override the organization's hourly rate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, Money, OrganizationId, SubjectId};

use crate::error::{EnrollmentError, ObligationDetail};

/// Lifecycle states of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    /// Registered but not yet attending
    Enrolled,
    /// Currently attending
    Active,
    /// Enrollment period has ended
    Expired,
}

impl SubjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectStatus::Enrolled => "enrolled",
            SubjectStatus::Active => "active",
            SubjectStatus::Expired => "expired",
        }
    }
}

/// How a subject is billed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BillingArrangement {
    /// Fixed installment schedule
    Installment,
    /// Billed by elapsed attendance time
    UsageMetered {
        /// Overrides the organization default when set
        custom_hourly_rate: Option<Money>,
    },
}

/// Open financial state used by the deletion guard
///
/// Assembled by the caller from ledger and schedule queries; the guard
/// itself is a pure check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligationSummary {
    pub active_plan_id: Option<core_kernel::PlanId>,
    pub unpaid_items: u32,
    pub outstanding: Money,
}

impl ObligationSummary {
    /// True when nothing blocks removal of the subject
    pub fn is_clear(&self) -> bool {
        self.active_plan_id.is_none() && self.unpaid_items == 0 && !self.outstanding.is_positive()
    }
}

/// A billable entity scoped to one organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    id: SubjectId,
    organization_id: OrganizationId,
    /// Class or program the subject belongs to; drives charge-catalog lookups
    program_class: String,
    status: SubjectStatus,
    billing: BillingArrangement,
    /// Enrollment validity window
    period: DateRange,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Subject {
    /// Enrolls a subject on a fixed installment arrangement
    pub fn enroll_installment(
        organization_id: OrganizationId,
        program_class: impl Into<String>,
        period: DateRange,
    ) -> Self {
        Self::enroll(organization_id, program_class, BillingArrangement::Installment, period)
    }

    /// Enrolls a subject billed by attendance time
    pub fn enroll_usage_metered(
        organization_id: OrganizationId,
        program_class: impl Into<String>,
        period: DateRange,
        custom_hourly_rate: Option<Money>,
    ) -> Self {
        Self::enroll(
            organization_id,
            program_class,
            BillingArrangement::UsageMetered { custom_hourly_rate },
            period,
        )
    }

    fn enroll(
        organization_id: OrganizationId,
        program_class: impl Into<String>,
        billing: BillingArrangement,
        period: DateRange,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubjectId::new_v7(),
            organization_id,
            program_class: program_class.into(),
            status: SubjectStatus::Enrolled,
            billing,
            period,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SubjectId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn program_class(&self) -> &str {
        &self.program_class
    }

    pub fn status(&self) -> SubjectStatus {
        self.status
    }

    pub fn billing(&self) -> &BillingArrangement {
        &self.billing
    }

    pub fn period(&self) -> DateRange {
        self.period
    }

    pub fn is_usage_metered(&self) -> bool {
        matches!(self.billing, BillingArrangement::UsageMetered { .. })
    }

    /// The subject-specific hourly rate, if one was agreed
    pub fn custom_hourly_rate(&self) -> Option<Money> {
        match &self.billing {
            BillingArrangement::UsageMetered { custom_hourly_rate } => *custom_hourly_rate,
            BillingArrangement::Installment => None,
        }
    }

    /// Last day of the enrollment
    pub fn ends_on(&self) -> NaiveDate {
        self.period.end
    }

    /// True when the enrollment period ended before the given date
    pub fn is_past_end(&self, today: NaiveDate) -> bool {
        self.ends_on() < today
    }

    /// Marks the subject as attending
    pub fn activate(&mut self) -> Result<(), EnrollmentError> {
        match self.status {
            SubjectStatus::Enrolled => {
                self.status = SubjectStatus::Active;
                self.updated_at = Utc::now();
                Ok(())
            }
            other => Err(EnrollmentError::InvalidStateTransition {
                from: other.as_str().to_string(),
                to: "active".to_string(),
            }),
        }
    }

    /// Marks the enrollment as expired
    pub fn expire(&mut self) -> Result<(), EnrollmentError> {
        match self.status {
            SubjectStatus::Enrolled | SubjectStatus::Active => {
                self.status = SubjectStatus::Expired;
                self.updated_at = Utc::now();
                Ok(())
            }
            SubjectStatus::Expired => Err(EnrollmentError::InvalidStateTransition {
                from: "expired".to_string(),
                to: "expired".to_string(),
            }),
        }
    }

    /// Deletion guard: fails with structured detail while any plan is open
    /// or unpaid schedule items remain
    pub fn ensure_no_financial_obligations(
        &self,
        summary: &ObligationSummary,
    ) -> Result<(), EnrollmentError> {
        ensure_no_financial_obligations(self.id, summary)
    }
}

/// Deletion guard usable without rehydrating the full subject
///
/// Persistence callers hold the subject id and the obligation summary; the
/// check itself needs nothing else.
pub fn ensure_no_financial_obligations(
    subject_id: SubjectId,
    summary: &ObligationSummary,
) -> Result<(), EnrollmentError> {
    if summary.is_clear() {
        return Ok(());
    }
    Err(EnrollmentError::ActiveFinancialObligations(ObligationDetail {
        subject_id,
        active_plan_id: summary.active_plan_id,
        unpaid_items: summary.unpaid_items,
        outstanding: summary.outstanding,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, PlanId};
    use rust_decimal_macros::dec;

    fn period() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_enrollment_defaults() {
        let subject = Subject::enroll_installment(OrganizationId::new(), "grade-5", period());
        assert_eq!(subject.status(), SubjectStatus::Enrolled);
        assert!(!subject.is_usage_metered());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut subject = Subject::enroll_installment(OrganizationId::new(), "grade-5", period());
        subject.activate().unwrap();
        assert_eq!(subject.status(), SubjectStatus::Active);

        subject.expire().unwrap();
        assert_eq!(subject.status(), SubjectStatus::Expired);

        assert!(matches!(
            subject.expire(),
            Err(EnrollmentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_activate_requires_enrolled() {
        let mut subject = Subject::enroll_installment(OrganizationId::new(), "grade-5", period());
        subject.activate().unwrap();
        assert!(matches!(
            subject.activate(),
            Err(EnrollmentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_custom_rate_resolution_source() {
        let rate = Money::new(dec!(120), Currency::USD);
        let subject = Subject::enroll_usage_metered(
            OrganizationId::new(),
            "daycare-toddler",
            period(),
            Some(rate),
        );
        assert!(subject.is_usage_metered());
        assert_eq!(subject.custom_hourly_rate(), Some(rate));
    }

    #[test]
    fn test_deletion_guard_blocks_open_obligations() {
        let subject = Subject::enroll_installment(OrganizationId::new(), "grade-5", period());
        let summary = ObligationSummary {
            active_plan_id: Some(PlanId::new()),
            unpaid_items: 3,
            outstanding: Money::new(dec!(3000), Currency::USD),
        };

        let err = subject.ensure_no_financial_obligations(&summary).unwrap_err();
        match err {
            EnrollmentError::ActiveFinancialObligations(detail) => {
                assert_eq!(detail.subject_id, subject.id());
                assert_eq!(detail.unpaid_items, 3);
                assert!(detail.active_plan_id.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deletion_guard_clear() {
        let subject = Subject::enroll_installment(OrganizationId::new(), "grade-5", period());
        let summary = ObligationSummary {
            active_plan_id: None,
            unpaid_items: 0,
            outstanding: Money::zero(Currency::USD),
        };
        assert!(subject.ensure_no_financial_obligations(&summary).is_ok());
    }
}
