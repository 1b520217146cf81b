//! Billing DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use infra_db::{PaymentRow, PlanRow, ScheduleItemRow};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    /// "installment" or "usage_metered"
    pub plan_kind: String,
    pub total_amount: Option<Decimal>,
    #[validate(range(min = 1))]
    pub installment_count: Option<u32>,
    /// "monthly" (default) or "quarterly"
    pub frequency: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub committed_hours: Option<Decimal>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Raises an immediate pending registration payment when set
    pub registration_fee: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub subject_id: Uuid,
    pub amount: Decimal,
    pub paid_on: Option<NaiveDate>,
    /// "cash", "bank_transfer", "card", "upi", "cheque", "digital_wallet"
    pub mode: String,
    /// "tuition", "registration", "usage_charge", "additional_charge"
    pub category: String,
    pub schedule_item_id: Option<Uuid>,
    pub transaction_ref: Option<Uuid>,
    pub discount: Option<Decimal>,
    /// Defaults to true: counter payments settle immediately
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleItemResponse {
    pub id: Uuid,
    pub sequence_number: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: String,
}

impl From<ScheduleItemRow> for ScheduleItemResponse {
    fn from(row: ScheduleItemRow) -> Self {
        Self {
            id: row.item_id,
            sequence_number: row.sequence_number,
            due_date: row.due_date,
            amount: row.amount,
            status: row.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub plan_kind: String,
    pub status: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub schedule: Vec<ScheduleItemResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_bill_id: Option<Uuid>,
}

impl PlanResponse {
    pub fn from_rows(
        plan: PlanRow,
        schedule: Vec<ScheduleItemRow>,
        initial_bill_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: plan.plan_id,
            subject_id: plan.subject_id,
            plan_kind: plan.plan_kind,
            status: plan.status,
            total_amount: plan.total_amount,
            currency: plan.currency,
            start_date: plan.start_date,
            end_date: plan.end_date,
            schedule: schedule.into_iter().map(Into::into).collect(),
            initial_bill_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub payment_seq: i64,
    pub subject_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub category: String,
    pub mode: String,
    pub status: String,
    pub paid_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_item_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_no: Option<String>,
}

impl From<PaymentRow> for PaymentResponse {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.payment_id,
            payment_seq: row.payment_seq,
            subject_id: row.subject_id,
            amount: row.amount,
            currency: row.currency,
            category: row.category,
            mode: row.mode,
            status: row.status,
            paid_on: row.paid_on,
            schedule_item_id: row.schedule_item_id,
            receipt_no: row.receipt_no,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub payment_id: Uuid,
    pub receipt_no: String,
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub backfilled: u64,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub subject_id: Uuid,
    pub expected: Decimal,
    pub collected_tuition: Decimal,
    pub collected_additional: Decimal,
    pub total_due: Decimal,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,
    pub overdue_count: u32,
    /// True when served from the read cache
    pub cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct UsageChargeQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize)]
pub struct UsageChargeResponse {
    pub subject_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub hourly_rate: Decimal,
    pub charge: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    /// Defaults to today's date
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    pub expiring_notified: u32,
    pub expired: u32,
    pub overdue_notified: u32,
    pub failures: u32,
}
