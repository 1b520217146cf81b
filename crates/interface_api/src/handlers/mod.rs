//! Request handlers for each domain

pub mod health;
pub mod plans;
pub mod payments;
pub mod subjects;
pub mod attendance;
pub mod reconciliation;

use uuid::Uuid;

use core_kernel::{CoreError, Currency};

use crate::auth::OrgContext;
use crate::error::ApiError;

/// Cross-organization access is reported as not-found, never as a hint
/// that the resource exists elsewhere
pub(crate) fn ensure_same_org(ctx: &OrgContext, organization_id: Uuid) -> Result<(), ApiError> {
    if Uuid::from(ctx.organization_id) != organization_id {
        return Err(ApiError::NotFound("resource not found".to_string()));
    }
    Ok(())
}

pub(crate) fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    Currency::from_code(code).ok_or_else(|| {
        CoreError::Configuration(format!("organization has unknown currency '{code}'")).into()
    })
}

pub(crate) fn parse_timezone(name: &str) -> core_kernel::Timezone {
    name.parse::<chrono_tz::Tz>()
        .map(core_kernel::Timezone::new)
        .unwrap_or_default()
}
