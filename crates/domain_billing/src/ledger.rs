//! Payment ledger
//!
//! The ledger records immutable payment events, assigns the monotonic
//! sequence that receipt numbers derive from, and applies payments to plan
//! schedule items. It mirrors exactly the semantics the persistence layer
//! implements in SQL, which keeps the aggregator and the invariants
//! unit-testable without a database.
//!
//! # Receipt issuance
//!
//! A receipt number is a pure function of already-recorded state:
//! `{organization_prefix}/{academic_year}/{zero-padded ledger sequence}`.
//! Issuing is therefore idempotent; retries and the backfill sweep can never
//! produce two different numbers for the same payment.

use chrono::Utc;
use tracing::info;

use core_kernel::{PaymentId, SubjectId};

use crate::error::BillingError;
use crate::events::BillingEvent;
use crate::payment::{ChargeCategory, Payment, PaymentMode, PaymentStatus};
use crate::plan::BillingPlan;

/// Context for deriving receipt numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptContext {
    /// Short organization prefix, e.g. "SPS"
    pub organization_prefix: String,
    /// Academic year label, e.g. "2024-25"
    pub academic_year: String,
}

/// Derives the receipt number for a ledger sequence
pub fn receipt_number(ctx: &ReceiptContext, ledger_seq: u64) -> String {
    format!(
        "{}/{}/{:06}",
        ctx.organization_prefix, ctx.academic_year, ledger_seq
    )
}

/// A request to record a payment
#[derive(Debug, Clone)]
pub struct RecordPaymentRequest {
    pub subject_id: SubjectId,
    pub amount: core_kernel::Money,
    pub paid_on: chrono::NaiveDate,
    pub mode: PaymentMode,
    pub category: ChargeCategory,
    /// Schedule item the payment settles; requires the owning plan
    pub schedule_item_id: Option<core_kernel::ScheduleItemId>,
    pub transaction_id: Option<core_kernel::TransactionId>,
    pub discount: Option<core_kernel::Money>,
    /// Counter payments settle immediately; gateway payments stay pending
    pub completed: bool,
}

/// Records payments and issues receipts
///
/// # Invariants
///
/// - Payments are append-only; recorded events are never removed
/// - Ledger sequences increase monotonically and are never reused
/// - A schedule item is settled exactly or not at all
#[derive(Debug, Default)]
pub struct PaymentLedger {
    payments: Vec<Payment>,
    next_seq: u64,
    events: Vec<BillingEvent>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self {
            payments: Vec::new(),
            next_seq: 1,
            events: Vec::new(),
        }
    }

    /// Records a payment, optionally applying it to a plan schedule item
    ///
    /// When `schedule_item_id` is set the owning plan must be supplied; the
    /// item is settled under the exact-amount rule and plan completion is
    /// re-checked immediately, inside the same unit of work.
    ///
    /// # Errors
    ///
    /// - `InvalidPaymentAmount` when the amount is not strictly positive
    /// - `AmountMismatch` / `ItemAlreadyPaid` from schedule application
    pub fn record_payment(
        &mut self,
        request: RecordPaymentRequest,
        mut plan: Option<&mut BillingPlan>,
    ) -> Result<&Payment, BillingError> {
        if !request.amount.is_positive() {
            return Err(BillingError::InvalidPaymentAmount(request.amount.amount()));
        }

        let mut payment = Payment::new(
            request.subject_id,
            request.amount,
            request.paid_on,
            request.mode,
            request.category,
        );
        if let Some(discount) = request.discount {
            payment = payment.with_discount(discount);
        }
        if let Some(transaction_id) = request.transaction_id {
            payment = payment.with_transaction(transaction_id);
        }

        if let Some(item_id) = request.schedule_item_id {
            let plan = plan.as_deref_mut().ok_or_else(|| {
                BillingError::ScheduleItemNotFound(format!(
                    "{item_id} referenced without its owning plan"
                ))
            })?;
            payment = payment.against_item(item_id);
            plan.mark_item_paid(item_id, payment.id, request.amount)?;
        }

        if request.completed {
            payment.complete();
        }

        // Completion is re-evaluated after every payment referencing the plan
        if payment.schedule_item_id.is_some() {
            if let Some(plan) = plan.as_deref_mut() {
                plan.check_completion();
            }
        }

        Ok(self.push(payment))
    }

    /// Adopts a payment built elsewhere (e.g. the initial registration bill
    /// raised at plan creation), assigning it a ledger sequence
    pub fn adopt(&mut self, payment: Payment) -> &Payment {
        self.push(payment)
    }

    fn push(&mut self, mut payment: Payment) -> &Payment {
        payment.ledger_seq = Some(self.next_seq);
        self.next_seq += 1;

        self.events.push(BillingEvent::PaymentRecorded {
            payment_id: payment.id,
            subject_id: payment.subject_id,
            amount: payment.amount.amount(),
            currency: payment.amount.currency().to_string(),
            category: payment.category.as_str().to_string(),
            paid_on: payment.paid_on,
            timestamp: Utc::now(),
        });

        self.payments.push(payment);
        self.payments.last().expect("just pushed")
    }

    /// Issues (or re-reads) the receipt number for a payment
    ///
    /// Idempotent: if the payment already carries a receipt number it is
    /// returned unchanged; otherwise the number is derived from the ledger
    /// sequence and persisted with first-write-wins semantics.
    pub fn issue_receipt(
        &mut self,
        payment_id: PaymentId,
        ctx: &ReceiptContext,
    ) -> Result<String, BillingError> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| BillingError::PaymentNotFound(payment_id.to_string()))?;

        if let Some(existing) = &payment.receipt_no {
            return Ok(existing.clone());
        }

        let seq = payment
            .ledger_seq
            .expect("recorded payments always carry a ledger sequence");
        let receipt = payment
            .set_receipt_if_absent(receipt_number(ctx, seq))
            .to_string();

        self.events.push(BillingEvent::ReceiptIssued {
            payment_id,
            receipt_no: receipt.clone(),
            timestamp: Utc::now(),
        });

        Ok(receipt)
    }

    /// Repairs historical gaps: issues receipts for every payment lacking one
    ///
    /// Safe to run repeatedly and concurrently with live traffic; already
    /// numbered payments are untouched. Returns how many were backfilled.
    pub fn backfill_missing_receipts(&mut self, ctx: &ReceiptContext) -> usize {
        let missing: Vec<PaymentId> = self
            .payments
            .iter()
            .filter(|p| p.receipt_no.is_none())
            .map(|p| p.id)
            .collect();

        let count = missing.len();
        for payment_id in missing {
            // Cannot fail: the id was just read from the ledger
            let _ = self.issue_receipt(payment_id, ctx);
        }

        if count > 0 {
            info!(backfilled = count, "receipt backfill sweep applied");
        }
        count
    }

    pub fn get(&self, payment_id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }

    /// Marks a pending payment as completed
    pub fn complete_payment(&mut self, payment_id: PaymentId) -> Result<&Payment, BillingError> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| BillingError::PaymentNotFound(payment_id.to_string()))?;
        payment.complete();
        Ok(payment)
    }

    /// All payments for a subject, in ledger order
    pub fn payments_for_subject(&self, subject_id: SubjectId) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.subject_id == subject_id)
            .collect()
    }

    /// Completed payments for a subject, the aggregator's input
    pub fn completed_for_subject(&self, subject_id: SubjectId) -> Vec<Payment> {
        self.payments
            .iter()
            .filter(|p| p.subject_id == subject_id && p.status == PaymentStatus::Completed)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Returns accumulated ledger events and clears them
    pub fn take_events(&mut self) -> Vec<BillingEvent> {
        std::mem::take(&mut self.events)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{Currency, Money};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn receipt_issuance_is_idempotent(calls in 1usize..20usize, minor in 1i64..1_000_000i64) {
            let mut ledger = PaymentLedger::new();
            let ctx = ReceiptContext {
                organization_prefix: "ORG".to_string(),
                academic_year: "2024-25".to_string(),
            };
            let payment_id = ledger
                .record_payment(
                    RecordPaymentRequest {
                        subject_id: SubjectId::new(),
                        amount: Money::from_minor(minor, Currency::USD),
                        paid_on: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
                        mode: PaymentMode::Cash,
                        category: ChargeCategory::Tuition,
                        schedule_item_id: None,
                        transaction_id: None,
                        discount: None,
                        completed: true,
                    },
                    None,
                )
                .unwrap()
                .id;

            let first = ledger.issue_receipt(payment_id, &ctx).unwrap();
            for _ in 0..calls {
                prop_assert_eq!(ledger.issue_receipt(payment_id, &ctx).unwrap(), first.clone());
            }
        }
    }
}
