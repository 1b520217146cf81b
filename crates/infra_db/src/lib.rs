//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the billing engine
//! using SQLx, following the repository pattern: domain crates stay pure,
//! the repositories here own the SQL and the two serialization points.
//!
//! # Serialization points
//!
//! Two operations must be serialized per subject (create-plan vs the
//! duplicate-active check, and record-payment vs the completion check).
//! Both run inside a single transaction holding a per-subject advisory
//! lock, with the partial unique index on active plans as a second line of
//! defense beneath the application-level check.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PlanRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/billing")).await?;
//! let repo = PlanRepository::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::{
    AttendanceRepository, AttendanceRow, EnrollmentRepository, NewPayment,
    OrganizationRepository, OrganizationRow, PaymentRepository, PaymentRow, PlanRepository,
    PlanRow, ScheduleItemRow,
};
