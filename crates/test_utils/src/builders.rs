//! Test data builders
//!
//! Builder patterns for constructing test data with sensible defaults.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{Money, OrganizationId, ScheduleItemId, SubjectId};
use domain_billing::{
    ChargeCategory, InstallmentFrequency, PaymentMode, PlanParams, PlanTerms,
    RecordPaymentRequest,
};

use crate::fixtures::{IdFixtures, MoneyFixtures, TemporalFixtures};

/// Builder for plan parameters
///
/// Defaults to the standard scenario: 6000 total, six monthly installments,
/// one academic term.
pub struct PlanParamsBuilder {
    subject_id: SubjectId,
    organization_id: OrganizationId,
    terms: PlanTerms,
    start_date: NaiveDate,
    end_date: NaiveDate,
    registration_fee: Option<Money>,
}

impl Default for PlanParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanParamsBuilder {
    pub fn new() -> Self {
        Self {
            subject_id: IdFixtures::subject_id(),
            organization_id: IdFixtures::organization_id(),
            terms: PlanTerms::Installment {
                total_amount: MoneyFixtures::annual_tuition(),
                installment_count: 6,
                frequency: InstallmentFrequency::Monthly,
            },
            start_date: TemporalFixtures::term_start(),
            end_date: TemporalFixtures::term_end(),
            registration_fee: None,
        }
    }

    pub fn with_subject(mut self, subject_id: SubjectId) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn with_installments(mut self, total_amount: Money, installment_count: u32) -> Self {
        self.terms = PlanTerms::Installment {
            total_amount,
            installment_count,
            frequency: InstallmentFrequency::Monthly,
        };
        self
    }

    pub fn usage_metered(mut self, hourly_rate: Money, committed_hours: Decimal) -> Self {
        self.terms = PlanTerms::UsageMetered {
            hourly_rate,
            committed_hours,
        };
        self
    }

    pub fn with_period(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn with_registration_fee(mut self, fee: Money) -> Self {
        self.registration_fee = Some(fee);
        self
    }

    pub fn build(self) -> PlanParams {
        PlanParams {
            subject_id: self.subject_id,
            organization_id: self.organization_id,
            terms: self.terms,
            start_date: self.start_date,
            end_date: self.end_date,
            registration_fee: self.registration_fee,
        }
    }
}

/// Builder for tuition payment requests
pub struct TuitionPaymentBuilder {
    subject_id: SubjectId,
    amount: Money,
    paid_on: NaiveDate,
    category: ChargeCategory,
    schedule_item_id: Option<ScheduleItemId>,
    completed: bool,
}

impl TuitionPaymentBuilder {
    pub fn new(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            amount: MoneyFixtures::monthly_installment(),
            paid_on: TemporalFixtures::early_report_date(),
            category: ChargeCategory::Tuition,
            schedule_item_id: None,
            completed: true,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_category(mut self, category: ChargeCategory) -> Self {
        self.category = category;
        self
    }

    pub fn against_item(mut self, item_id: ScheduleItemId) -> Self {
        self.schedule_item_id = Some(item_id);
        self
    }

    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.paid_on = date;
        self
    }

    pub fn pending(mut self) -> Self {
        self.completed = false;
        self
    }

    pub fn build(self) -> RecordPaymentRequest {
        RecordPaymentRequest {
            subject_id: self.subject_id,
            amount: self.amount,
            paid_on: self.paid_on,
            mode: PaymentMode::BankTransfer,
            category: self.category,
            schedule_item_id: self.schedule_item_id,
            transaction_id: None,
            discount: None,
            completed: self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_billing::BillingPlan;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_plan_builds() {
        let (plan, initial_bill) = BillingPlan::create(PlanParamsBuilder::new().build()).unwrap();
        assert_eq!(plan.schedule().len(), 6);
        assert!(initial_bill.is_none());
    }

    #[test]
    fn test_usage_metered_builder() {
        let params = PlanParamsBuilder::new()
            .usage_metered(MoneyFixtures::hourly_rate(), dec!(40))
            .build();
        let (plan, _) = BillingPlan::create(params).unwrap();
        assert!(plan.is_usage_metered());
    }

    #[test]
    fn test_payment_builder_defaults() {
        let request = TuitionPaymentBuilder::new(IdFixtures::subject_id()).build();
        assert_eq!(request.category, ChargeCategory::Tuition);
        assert!(request.completed);
    }
}
