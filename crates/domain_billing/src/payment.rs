//! Payment records
//!
//! A payment is an immutable financial event. After creation only two things
//! may happen to it: the `pending -> completed` transition, and a one-time
//! receipt number backfill.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, PaymentId, ScheduleItemId, SubjectId, TransactionId};

/// Payment mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    BankTransfer,
    Card,
    Upi,
    Cheque,
    DigitalWallet,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::BankTransfer => "bank_transfer",
            PaymentMode::Card => "card",
            PaymentMode::Upi => "upi",
            PaymentMode::Cheque => "cheque",
            PaymentMode::DigitalWallet => "digital_wallet",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "cash" => Some(PaymentMode::Cash),
            "bank_transfer" => Some(PaymentMode::BankTransfer),
            "card" => Some(PaymentMode::Card),
            "upi" => Some(PaymentMode::Upi),
            "cheque" => Some(PaymentMode::Cheque),
            "digital_wallet" => Some(PaymentMode::DigitalWallet),
            _ => None,
        }
    }
}

/// Ledger category a payment belongs to
///
/// Tuition collections reduce the subject's due amount; every other category
/// is billed on top of tuition and tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeCategory {
    Tuition,
    Registration,
    UsageCharge,
    AdditionalCharge,
}

impl ChargeCategory {
    /// True for the categories that never reduce tuition due
    pub fn is_additional(&self) -> bool {
        !matches!(self, ChargeCategory::Tuition)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeCategory::Tuition => "tuition",
            ChargeCategory::Registration => "registration",
            ChargeCategory::UsageCharge => "usage_charge",
            ChargeCategory::AdditionalCharge => "additional_charge",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "tuition" => Some(ChargeCategory::Tuition),
            "registration" => Some(ChargeCategory::Registration),
            "usage_charge" => Some(ChargeCategory::UsageCharge),
            "additional_charge" => Some(ChargeCategory::AdditionalCharge),
            _ => None,
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Recorded but awaiting settlement confirmation
    Pending,
    /// Settled; counts toward collections
    Completed,
}

/// An immutable payment event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Subject the payment belongs to
    pub subject_id: SubjectId,
    /// Amount paid
    pub amount: Money,
    /// Discount applied at collection time, informational
    pub discount: Option<Money>,
    /// Value date of the payment
    pub paid_on: NaiveDate,
    /// Payment mode
    pub mode: PaymentMode,
    /// Ledger category
    pub category: ChargeCategory,
    /// Schedule item this payment settles, if any
    pub schedule_item_id: Option<ScheduleItemId>,
    /// External transaction reference
    pub transaction_id: Option<TransactionId>,
    /// Receipt number, unique per organization-year; backfilled when absent
    pub receipt_no: Option<String>,
    /// Status
    pub status: PaymentStatus,
    /// Monotonic ledger sequence, assigned when recorded
    pub ledger_seq: Option<u64>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When status changed to completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a new payment in pending status
    pub fn new(
        subject_id: SubjectId,
        amount: Money,
        paid_on: NaiveDate,
        mode: PaymentMode,
        category: ChargeCategory,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            subject_id,
            amount,
            discount: None,
            paid_on,
            mode,
            category,
            schedule_item_id: None,
            transaction_id: None,
            receipt_no: None,
            status: PaymentStatus::Pending,
            ledger_seq: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Links the payment to a schedule item
    pub fn against_item(mut self, item_id: ScheduleItemId) -> Self {
        self.schedule_item_id = Some(item_id);
        self
    }

    /// Attaches an external transaction reference
    pub fn with_transaction(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Records a discount applied at collection time
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Marks the payment as completed
    pub fn complete(&mut self) {
        if self.status == PaymentStatus::Pending {
            self.status = PaymentStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Sets the receipt number if absent; returns the effective number
    ///
    /// The persist-if-absent semantics make repeated issuance harmless: the
    /// first write wins and every later call observes it.
    pub fn set_receipt_if_absent(&mut self, receipt_no: String) -> &str {
        if self.receipt_no.is_none() {
            self.receipt_no = Some(receipt_no);
        }
        self.receipt_no.as_deref().expect("receipt set above")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::new(
            SubjectId::new(),
            Money::new(dec!(1000), Currency::USD),
            NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
            PaymentMode::BankTransfer,
            ChargeCategory::Tuition,
        )
    }

    #[test]
    fn test_payment_starts_pending() {
        let p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.receipt_no.is_none());
        assert!(p.ledger_seq.is_none());
    }

    #[test]
    fn test_complete_transition() {
        let mut p = payment();
        p.complete();
        assert!(p.is_completed());
        assert!(p.completed_at.is_some());

        let completed_at = p.completed_at;
        p.complete();
        assert_eq!(p.completed_at, completed_at);
    }

    #[test]
    fn test_receipt_first_write_wins() {
        let mut p = payment();
        let first = p.set_receipt_if_absent("SPS/2024-25/000001".to_string()).to_string();
        let second = p.set_receipt_if_absent("SPS/2024-25/999999".to_string()).to_string();
        assert_eq!(first, second);
        assert_eq!(p.receipt_no.as_deref(), Some("SPS/2024-25/000001"));
    }

    #[test]
    fn test_additional_categories() {
        assert!(!ChargeCategory::Tuition.is_additional());
        assert!(ChargeCategory::Registration.is_additional());
        assert!(ChargeCategory::UsageCharge.is_additional());
        assert!(ChargeCategory::AdditionalCharge.is_additional());
    }

    #[test]
    fn test_builder_links() {
        let item = ScheduleItemId::new();
        let txn = TransactionId::new();
        let p = payment().against_item(item).with_transaction(txn);
        assert_eq!(p.schedule_item_id, Some(item));
        assert_eq!(p.transaction_id, Some(txn));
    }
}
