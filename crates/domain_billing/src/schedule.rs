//! Installment schedules
//!
//! The schedule generator turns plan parameters into an ordered sequence of
//! due obligations whose amounts sum exactly to the plan total.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, PaymentId, ScheduleItemId};

use crate::error::BillingError;

/// How often installments fall due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentFrequency {
    Monthly,
    Quarterly,
}

impl InstallmentFrequency {
    /// Calculates the next due date from a given date
    ///
    /// Month arithmetic clamps overflow: advancing Jan 31 by one month
    /// falls back to a plain 30-day step when the target day does not exist.
    pub fn next_due_date(&self, from_date: NaiveDate) -> NaiveDate {
        let months = match self {
            InstallmentFrequency::Monthly => 1,
            InstallmentFrequency::Quarterly => 3,
        };
        add_months(from_date, months)
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, date.day())
        .unwrap_or(date + chrono::Duration::days(30 * months as i64))
}

/// Status of one due obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleItemStatus {
    /// Due but not yet settled
    Pending,
    /// Settled by a matching payment
    Paid,
}

/// One due obligation belonging to a billing plan
///
/// Items are ordered by due date; the earliest pending item answers the
/// "next due" question. An item flips to `Paid` only through a matching
/// payment, which is recorded in `paid_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Unique identifier
    pub id: ScheduleItemId,
    /// Position in the schedule (1, 2, 3, ...)
    pub sequence_number: u32,
    /// Due date
    pub due_date: NaiveDate,
    /// Amount due
    pub amount: Money,
    /// Settlement status
    pub status: ScheduleItemStatus,
    /// Payment that settled this item
    pub paid_by: Option<PaymentId>,
}

impl ScheduleItem {
    pub fn is_pending(&self) -> bool {
        self.status == ScheduleItemStatus::Pending
    }

    /// A pending item whose due date is strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_pending() && self.due_date < today
    }

    /// Settles the item with the given payment
    pub fn mark_paid(&mut self, payment_id: PaymentId) -> Result<(), BillingError> {
        if self.status == ScheduleItemStatus::Paid {
            return Err(BillingError::ItemAlreadyPaid(self.id));
        }
        self.status = ScheduleItemStatus::Paid;
        self.paid_by = Some(payment_id);
        Ok(())
    }
}

/// Generates an ordered installment schedule
///
/// Validates that the total is positive and the installment count non-zero,
/// then splits the total so the amounts sum exactly to it: every installment
/// gets the evenly rounded share and the last one absorbs the remainder.
///
/// # Errors
///
/// Returns `InvalidPlanParameters` on violated constraints.
pub fn generate_schedule(
    total_amount: Money,
    installment_count: u32,
    start_date: NaiveDate,
    frequency: InstallmentFrequency,
) -> Result<Vec<ScheduleItem>, BillingError> {
    if !total_amount.is_positive() {
        return Err(BillingError::InvalidPlanParameters(format!(
            "total amount must be positive, got {}",
            total_amount.amount()
        )));
    }
    if installment_count == 0 {
        return Err(BillingError::InvalidPlanParameters(
            "installment count must be positive".to_string(),
        ));
    }

    let amounts = total_amount.split_last_remainder(installment_count)?;

    let mut items = Vec::with_capacity(installment_count as usize);
    let mut due_date = start_date;
    for (index, amount) in amounts.into_iter().enumerate() {
        items.push(ScheduleItem {
            id: ScheduleItemId::new_v7(),
            sequence_number: index as u32 + 1,
            due_date,
            amount,
            status: ScheduleItemStatus::Pending,
            paid_by: None,
        });
        due_date = frequency.next_due_date(due_date);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_schedule_sums_to_total() {
        let total = Money::new(dec!(6000), Currency::USD);
        let items = generate_schedule(total, 6, date(2024, 4, 1), InstallmentFrequency::Monthly)
            .unwrap();

        assert_eq!(items.len(), 6);
        let sum = items
            .iter()
            .fold(Money::zero(Currency::USD), |acc, i| acc + i.amount);
        assert_eq!(sum, total);
        assert_eq!(items[0].amount.amount(), dec!(1000));
    }

    #[test]
    fn test_last_item_absorbs_remainder() {
        let total = Money::new(dec!(1000), Currency::USD);
        let items = generate_schedule(total, 3, date(2024, 4, 1), InstallmentFrequency::Monthly)
            .unwrap();

        assert_eq!(items[0].amount.amount(), dec!(333.33));
        assert_eq!(items[1].amount.amount(), dec!(333.33));
        assert_eq!(items[2].amount.amount(), dec!(333.34));
    }

    #[test]
    fn test_monthly_due_dates() {
        let items = generate_schedule(
            Money::new(dec!(300), Currency::USD),
            3,
            date(2024, 1, 15),
            InstallmentFrequency::Monthly,
        )
        .unwrap();

        assert_eq!(items[0].due_date, date(2024, 1, 15));
        assert_eq!(items[1].due_date, date(2024, 2, 15));
        assert_eq!(items[2].due_date, date(2024, 3, 15));
    }

    #[test]
    fn test_quarterly_due_dates() {
        let items = generate_schedule(
            Money::new(dec!(400), Currency::USD),
            4,
            date(2024, 4, 1),
            InstallmentFrequency::Quarterly,
        )
        .unwrap();

        assert_eq!(items[1].due_date, date(2024, 7, 1));
        assert_eq!(items[3].due_date, date(2025, 1, 1));
    }

    #[test]
    fn test_year_rollover() {
        let items = generate_schedule(
            Money::new(dec!(300), Currency::USD),
            3,
            date(2024, 11, 10),
            InstallmentFrequency::Monthly,
        )
        .unwrap();

        assert_eq!(items[2].due_date, date(2025, 1, 10));
    }

    #[test]
    fn test_zero_total_rejected() {
        let result = generate_schedule(
            Money::zero(Currency::USD),
            6,
            date(2024, 4, 1),
            InstallmentFrequency::Monthly,
        );
        assert!(matches!(result, Err(BillingError::InvalidPlanParameters(_))));
    }

    #[test]
    fn test_negative_total_rejected() {
        let result = generate_schedule(
            Money::new(dec!(-100), Currency::USD),
            2,
            date(2024, 4, 1),
            InstallmentFrequency::Monthly,
        );
        assert!(matches!(result, Err(BillingError::InvalidPlanParameters(_))));
    }

    #[test]
    fn test_zero_installments_rejected() {
        let result = generate_schedule(
            Money::new(dec!(100), Currency::USD),
            0,
            date(2024, 4, 1),
            InstallmentFrequency::Monthly,
        );
        assert!(matches!(result, Err(BillingError::InvalidPlanParameters(_))));
    }

    #[test]
    fn test_mark_paid_once() {
        let mut items = generate_schedule(
            Money::new(dec!(100), Currency::USD),
            1,
            date(2024, 4, 1),
            InstallmentFrequency::Monthly,
        )
        .unwrap();

        let payment = PaymentId::new();
        items[0].mark_paid(payment).unwrap();
        assert_eq!(items[0].paid_by, Some(payment));
        assert!(matches!(
            items[0].mark_paid(PaymentId::new()),
            Err(BillingError::ItemAlreadyPaid(_))
        ));
    }

    #[test]
    fn test_overdue_uses_strict_comparison() {
        let items = generate_schedule(
            Money::new(dec!(100), Currency::USD),
            1,
            date(2024, 4, 1),
            InstallmentFrequency::Monthly,
        )
        .unwrap();

        assert!(!items[0].is_overdue(date(2024, 4, 1)));
        assert!(items[0].is_overdue(date(2024, 4, 2)));
    }
}
