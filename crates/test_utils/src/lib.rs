//! Shared Test Utilities
//!
//! Fixtures, builders, property-test generators and assertions used across
//! the workspace test suite. Tests specify only the fields they care about
//! and lean on defaults for the rest.

pub mod fixtures;
pub mod builders;
pub mod generators;
pub mod assertions;

pub use fixtures::{IdFixtures, MoneyFixtures, StringFixtures, TemporalFixtures};
pub use builders::{PlanParamsBuilder, TuitionPaymentBuilder};
