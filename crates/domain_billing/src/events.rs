//! Domain events for the billing aggregate
//!
//! Events capture the significant state changes of a plan and its ledger.
//! They feed audit trails and downstream processes (reporting, notification
//! fan-out) without coupling the aggregate to them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{PaymentId, PlanId, ScheduleItemId, SubjectId};

/// Domain events emitted by the billing aggregate and ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
    /// A plan and its schedule were created
    PlanCreated {
        plan_id: PlanId,
        subject_id: SubjectId,
        total_amount: Decimal,
        currency: String,
        installment_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// A schedule item was settled by a payment
    InstallmentPaid {
        plan_id: PlanId,
        item_id: ScheduleItemId,
        payment_id: PaymentId,
        sequence_number: u32,
        timestamp: DateTime<Utc>,
    },

    /// Every schedule item is paid
    PlanCompleted {
        plan_id: PlanId,
        timestamp: DateTime<Utc>,
    },

    /// Plan was cancelled before collection
    PlanCancelled {
        plan_id: PlanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A payment entered the ledger
    PaymentRecorded {
        payment_id: PaymentId,
        subject_id: SubjectId,
        amount: Decimal,
        currency: String,
        category: String,
        paid_on: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    /// A receipt number was assigned
    ReceiptIssued {
        payment_id: PaymentId,
        receipt_no: String,
        timestamp: DateTime<Utc>,
    },
}
