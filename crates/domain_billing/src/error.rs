//! Billing domain errors

use core_kernel::{MoneyError, PlanId, ScheduleItemId, SubjectId, TemporalError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Plan parameters rejected before any write
    #[error("Invalid plan parameters: {0}")]
    InvalidPlanParameters(String),

    /// Subject already has a plan in active status
    #[error("Subject {subject_id} already has an active billing plan")]
    DuplicateActivePlan { subject_id: SubjectId },

    /// Cancellation blocked: collected money references the plan
    #[error("Plan {plan_id} has {paid_items} paid item(s) and cannot be cancelled")]
    PlanHasPayments { plan_id: PlanId, paid_items: u32 },

    /// Payment amount must be strictly positive
    #[error("Invalid payment amount: {0}")]
    InvalidPaymentAmount(Decimal),

    /// Payment amount does not settle the schedule item exactly
    #[error("Payment of {actual} does not match schedule item {item} amount {expected}")]
    AmountMismatch {
        item: ScheduleItemId,
        expected: Decimal,
        actual: Decimal,
    },

    /// Schedule item was already settled
    #[error("Schedule item {0} is already paid")]
    ItemAlreadyPaid(ScheduleItemId),

    /// Schedule item not found on the plan
    #[error("Schedule item not found: {0}")]
    ScheduleItemNotFound(String),

    /// Payment not found in the ledger
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Plan not found
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Operation not allowed in the plan's current status
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Monetary calculation failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Period validation failed
    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),
}
