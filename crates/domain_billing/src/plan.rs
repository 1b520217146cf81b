//! Billing Plan Aggregate
//!
//! The BillingPlan is the consistency boundary for a subject's installment
//! or usage-metered agreement. It owns its schedule items and enforces the
//! lifecycle invariants.
//!
//! # Invariants
//!
//! - At most one plan per subject may be in `Active` status; callers check
//!   via [`ensure_no_active_plan`] under a per-subject serialization point,
//!   and persistence backs this with a partial unique index
//! - Schedule amounts sum exactly to the plan total
//! - A plan with paid items cannot be cancelled
//! - Terminal states (`Completed`, `Cancelled`) admit no further transitions
//!
//! # State Machine
//!
//! - Active -> Completed (via check_completion, once all items are paid)
//! - Active -> Cancelled (via cancel, only while nothing is collected)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BillingPeriod, Money, OrganizationId, PaymentId, PlanId, SubjectId};

use crate::error::BillingError;
use crate::events::BillingEvent;
use crate::payment::{ChargeCategory, Payment, PaymentMode};
use crate::schedule::{generate_schedule, InstallmentFrequency, ScheduleItem};

/// Plan lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

/// The financial terms of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanTerms {
    /// Fixed total split into installments
    Installment {
        total_amount: Money,
        installment_count: u32,
        frequency: InstallmentFrequency,
    },
    /// Hourly rate against committed hours; billed retrospectively
    UsageMetered {
        hourly_rate: Money,
        committed_hours: Decimal,
    },
}

impl PlanTerms {
    /// The agreed total for the plan
    pub fn total_amount(&self) -> Money {
        match self {
            PlanTerms::Installment { total_amount, .. } => *total_amount,
            PlanTerms::UsageMetered {
                hourly_rate,
                committed_hours,
            } => hourly_rate.multiply(*committed_hours).round_to_currency(),
        }
    }
}

/// Parameters for creating a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanParams {
    pub subject_id: SubjectId,
    pub organization_id: OrganizationId,
    pub terms: PlanTerms,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// When set, plan creation also raises an immediate registration-fee
    /// payment in pending status (the "initial bill")
    pub registration_fee: Option<Money>,
}

/// Checks the single-active-plan invariant against a subject's known plans
///
/// Must be evaluated under the per-subject serialization point (transaction
/// or advisory lock) so two concurrent creates cannot both pass.
pub fn ensure_no_active_plan(
    existing: &[BillingPlan],
    subject_id: SubjectId,
) -> Result<(), BillingError> {
    let has_active = existing
        .iter()
        .any(|p| p.subject_id() == subject_id && p.status() == PlanStatus::Active);
    if has_active {
        return Err(BillingError::DuplicateActivePlan { subject_id });
    }
    Ok(())
}

/// An installment or usage-metered agreement for one subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingPlan {
    id: PlanId,
    subject_id: SubjectId,
    organization_id: OrganizationId,
    terms: PlanTerms,
    period: BillingPeriod,
    status: PlanStatus,
    schedule: Vec<ScheduleItem>,
    /// Domain events to be published
    #[serde(skip)]
    events: Vec<BillingEvent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BillingPlan {
    /// Creates a plan and its schedule atomically (in memory)
    ///
    /// For installment terms the full schedule is generated up front and its
    /// amounts sum exactly to the total. Usage-metered terms carry no
    /// schedule; they bill retrospectively each month.
    ///
    /// Returns the plan and, when a registration fee was requested, the
    /// pending initial-bill payment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlanParameters` on non-positive amounts, a zero
    /// installment count, or an end date not strictly after the start date.
    pub fn create(params: PlanParams) -> Result<(Self, Option<Payment>), BillingError> {
        let period = BillingPeriod::new(params.start_date, params.end_date).map_err(|_| {
            BillingError::InvalidPlanParameters(format!(
                "end date {} must fall strictly after start date {}",
                params.end_date, params.start_date
            ))
        })?;

        let schedule = match &params.terms {
            PlanTerms::Installment {
                total_amount,
                installment_count,
                frequency,
            } => generate_schedule(*total_amount, *installment_count, params.start_date, *frequency)?,
            PlanTerms::UsageMetered {
                hourly_rate,
                committed_hours,
            } => {
                if !hourly_rate.is_positive() {
                    return Err(BillingError::InvalidPlanParameters(format!(
                        "hourly rate must be positive, got {}",
                        hourly_rate.amount()
                    )));
                }
                if *committed_hours <= Decimal::ZERO {
                    return Err(BillingError::InvalidPlanParameters(format!(
                        "committed hours must be positive, got {}",
                        committed_hours
                    )));
                }
                Vec::new()
            }
        };

        let now = Utc::now();
        let id = PlanId::new_v7();
        let total = params.terms.total_amount();

        let mut plan = Self {
            id,
            subject_id: params.subject_id,
            organization_id: params.organization_id,
            terms: params.terms,
            period,
            status: PlanStatus::Active,
            schedule,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        plan.events.push(BillingEvent::PlanCreated {
            plan_id: id,
            subject_id: plan.subject_id,
            total_amount: total.amount(),
            currency: total.currency().to_string(),
            installment_count: plan.schedule.len() as u32,
            timestamp: now,
        });

        let initial_bill = params.registration_fee.map(|fee| {
            Payment::new(
                plan.subject_id,
                fee,
                params.start_date,
                PaymentMode::Cash,
                ChargeCategory::Registration,
            )
        });

        Ok((plan, initial_bill))
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn terms(&self) -> &PlanTerms {
        &self.terms
    }

    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn schedule(&self) -> &[ScheduleItem] {
        &self.schedule
    }

    pub fn total_amount(&self) -> Money {
        self.terms.total_amount()
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    pub fn is_usage_metered(&self) -> bool {
        matches!(self.terms, PlanTerms::UsageMetered { .. })
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<BillingEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of schedule items already settled
    pub fn paid_item_count(&self) -> u32 {
        self.schedule.iter().filter(|i| !i.is_pending()).count() as u32
    }

    /// Settles a schedule item with the given payment
    ///
    /// The payment must cover the item exactly; a schedule item is atomic.
    /// Partial coverage belongs in a separate unscheduled payment that the
    /// aggregator reconciles, never in a mutated schedule amount.
    pub fn mark_item_paid(
        &mut self,
        item_id: core_kernel::ScheduleItemId,
        payment_id: PaymentId,
        paid_amount: Money,
    ) -> Result<(), BillingError> {
        if self.status != PlanStatus::Active {
            return Err(BillingError::InvalidOperation(format!(
                "cannot apply payment to {} plan {}",
                self.status.as_str(),
                self.id
            )));
        }

        let item = self
            .schedule
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| BillingError::ScheduleItemNotFound(item_id.to_string()))?;

        if paid_amount != item.amount {
            return Err(BillingError::AmountMismatch {
                item: item.id,
                expected: item.amount.amount(),
                actual: paid_amount.amount(),
            });
        }

        item.mark_paid(payment_id)?;
        let sequence_number = item.sequence_number;
        let now = Utc::now();
        self.updated_at = now;

        self.events.push(BillingEvent::InstallmentPaid {
            plan_id: self.id,
            item_id,
            payment_id,
            sequence_number,
            timestamp: now,
        });

        Ok(())
    }

    /// Returns true iff every schedule item is paid; transitions the plan
    /// to `Completed` on the first observation
    ///
    /// Re-evaluated after every payment that references the plan.
    pub fn check_completion(&mut self) -> bool {
        if self.status != PlanStatus::Active {
            return self.status == PlanStatus::Completed;
        }
        if self.schedule.is_empty() || self.schedule.iter().any(|i| i.is_pending()) {
            return false;
        }

        let now = Utc::now();
        self.status = PlanStatus::Completed;
        self.updated_at = now;
        self.events.push(BillingEvent::PlanCompleted {
            plan_id: self.id,
            timestamp: now,
        });
        true
    }

    /// Cancels the plan
    ///
    /// Cancellation never silently discards collected money: if any item is
    /// already paid the call fails with `PlanHasPayments` and the caller must
    /// handle refunds explicitly.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), BillingError> {
        if self.status != PlanStatus::Active {
            return Err(BillingError::InvalidOperation(format!(
                "cannot cancel {} plan {}",
                self.status.as_str(),
                self.id
            )));
        }

        let paid_items = self.paid_item_count();
        if paid_items > 0 {
            return Err(BillingError::PlanHasPayments {
                plan_id: self.id,
                paid_items,
            });
        }

        let now = Utc::now();
        self.status = PlanStatus::Cancelled;
        self.updated_at = now;
        self.events.push(BillingEvent::PlanCancelled {
            plan_id: self.id,
            reason: reason.into(),
            timestamp: now,
        });

        Ok(())
    }
}
