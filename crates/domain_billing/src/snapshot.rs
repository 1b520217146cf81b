//! Due & status aggregation
//!
//! The financial snapshot is a pure function over explicit inputs: completed
//! payments, schedule items, charge-catalog entries and the reporting date.
//! Nothing here reads shared state, which is what makes the derivation
//! independently unit-testable and safe to cache.
//!
//! # Status derivation
//!
//! The first matching rule wins, evaluated in this order:
//! 1. `NotPaid` if nothing was collected in any category
//! 2. `FullyPaid` if the due amount is zero
//! 3. `Overdue` if any currently pending item is past due
//! 4. `PartiallyPaid` if tuition was collected but due remains
//! 5. `Pending` otherwise
//!
//! The ordering is load-bearing: overdue counts only currently pending
//! items, so a historically late but since-settled installment can never
//! downgrade a fully paid subject.
//!
//! Tuition and ancillary billing are separate ledgers by design: collections
//! in the registration / usage / additional categories never reduce the
//! tuition due amount.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

use crate::error::BillingError;
use crate::payment::{Payment, PaymentStatus};
use crate::schedule::ScheduleItem;

/// One applicable entry from the external charge catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCharge {
    /// Charge type label, e.g. "tuition", "transport"
    pub charge_type: String,
    /// Amount per billing occurrence
    pub amount: Money,
    /// How often the charge applies
    pub frequency: ChargeFrequency,
}

/// Billing frequency of a catalog charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeFrequency {
    OneTime,
    Monthly,
    Annual,
}

/// Derived payment standing for a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStanding {
    NotPaid,
    FullyPaid,
    Overdue,
    PartiallyPaid,
    Pending,
}

impl PaymentStanding {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStanding::NotPaid => "not_paid",
            PaymentStanding::FullyPaid => "fully_paid",
            PaymentStanding::Overdue => "overdue",
            PaymentStanding::PartiallyPaid => "partially_paid",
            PaymentStanding::Pending => "pending",
        }
    }
}

/// Explicit inputs to the snapshot computation
#[derive(Debug, Clone)]
pub struct SnapshotInputs<'a> {
    /// Applicable charge-catalog entries for the subject's program class
    pub catalog_charges: &'a [CatalogCharge],
    /// Subject-specific plan total; takes precedence over the catalog
    pub custom_plan_total: Option<Money>,
    /// Payments for the subject (only completed ones count)
    pub payments: &'a [Payment],
    /// Schedule items for the subject's plans
    pub schedule: &'a [ScheduleItem],
    /// Reporting date, in the organization's local calendar
    pub today: NaiveDate,
    /// Ledger currency
    pub currency: Currency,
}

/// Per-subject aggregate of expected charges, collections and dues
///
/// Derived on read; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub expected: Money,
    pub collected_tuition: Money,
    pub collected_additional: Money,
    pub total_due: Money,
    pub status: PaymentStanding,
    pub next_due_date: Option<NaiveDate>,
    pub overdue_count: u32,
}

/// Derives the payment standing from the aggregate figures
///
/// Pure in its inputs; see the module docs for the rule ordering.
pub fn derive_standing(
    collected_tuition: Money,
    collected_additional: Money,
    total_due: Money,
    overdue_count: u32,
) -> PaymentStanding {
    if collected_tuition.is_zero() && collected_additional.is_zero() {
        return PaymentStanding::NotPaid;
    }
    if total_due.is_zero() {
        return PaymentStanding::FullyPaid;
    }
    if overdue_count > 0 {
        return PaymentStanding::Overdue;
    }
    if collected_tuition.is_positive() && total_due.is_positive() {
        return PaymentStanding::PartiallyPaid;
    }
    PaymentStanding::Pending
}

/// Computes the financial snapshot for one subject
///
/// # Errors
///
/// Returns a money error if inputs mix currencies.
pub fn compute_snapshot(inputs: SnapshotInputs<'_>) -> Result<FinancialSnapshot, BillingError> {
    let currency = inputs.currency;

    // Custom plan amount takes precedence over the catalog when present
    let expected = match inputs.custom_plan_total {
        Some(total) => total,
        None => {
            let mut sum = Money::zero(currency);
            for charge in inputs.catalog_charges {
                sum = sum.checked_add(&charge.amount)?;
            }
            sum
        }
    };

    let mut collected_tuition = Money::zero(currency);
    let mut collected_additional = Money::zero(currency);
    for payment in inputs.payments {
        if payment.status != PaymentStatus::Completed {
            continue;
        }
        if payment.category.is_additional() {
            collected_additional = collected_additional.checked_add(&payment.amount)?;
        } else {
            collected_tuition = collected_tuition.checked_add(&payment.amount)?;
        }
    }

    // Additional-category collections never reduce tuition due
    let remainder = expected.checked_sub(&collected_tuition)?;
    let total_due = if remainder.is_negative() {
        Money::zero(currency)
    } else {
        remainder
    };

    let next_due_date = inputs
        .schedule
        .iter()
        .filter(|i| i.is_pending())
        .map(|i| i.due_date)
        .min();

    let overdue_count = inputs
        .schedule
        .iter()
        .filter(|i| i.is_overdue(inputs.today))
        .count() as u32;

    let status = derive_standing(
        collected_tuition,
        collected_additional,
        total_due,
        overdue_count,
    );

    Ok(FinancialSnapshot {
        expected,
        collected_tuition,
        collected_additional,
        total_due,
        status,
        next_due_date,
        overdue_count,
    })
}
