//! Billing Domain - Fee & Enrollment Billing Reconciliation Engine
//!
//! This crate turns raw payment events into authoritative financial state
//! for a subject: installment scheduling, payment application, receipt
//! issuance, and due/status derivation.
//!
//! # Consistency invariants
//!
//! - At most one `Active` billing plan per subject at any time
//! - The amounts of a generated schedule sum exactly to the plan total
//!   (the last installment absorbs any rounding remainder)
//! - A schedule item is atomic: a payment settles it exactly or not at all
//! - Receipt numbers are derived deterministically from persisted state, so
//!   issuance is idempotent under retries and backfills
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingPlan, PlanParams, PaymentLedger};
//!
//! let plan = BillingPlan::create(params)?;
//! let payment = ledger.record_payment(request, Some(&mut plan))?;
//! let receipt = ledger.issue_receipt(payment, &receipt_ctx)?;
//! ```

pub mod plan;
pub mod schedule;
pub mod payment;
pub mod ledger;
pub mod snapshot;
pub mod events;
pub mod ports;
pub mod error;

pub use plan::{ensure_no_active_plan, BillingPlan, PlanParams, PlanStatus, PlanTerms};
pub use schedule::{generate_schedule, InstallmentFrequency, ScheduleItem, ScheduleItemStatus};
pub use payment::{ChargeCategory, Payment, PaymentMode, PaymentStatus};
pub use ledger::{receipt_number, PaymentLedger, ReceiptContext, RecordPaymentRequest};
pub use snapshot::{
    compute_snapshot, derive_standing, CatalogCharge, ChargeFrequency, FinancialSnapshot,
    PaymentStanding, SnapshotInputs,
};
pub use events::BillingEvent;
pub use ports::ChargeCatalog;
pub use error::BillingError;
