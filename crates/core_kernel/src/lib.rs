//! Core Kernel - Foundational types and utilities for the billing engine
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Temporal types for billing periods and organization-local time
//! - Common identifiers and value objects

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{BillingPeriod, DateRange, ReportingMonth, Timezone, TemporalError};
pub use identifiers::{
    OrganizationId, SubjectId, PlanId, ScheduleItemId,
    PaymentId, AttendanceId, TransactionId,
};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, OperationMetadata};
