//! Organization repository
//!
//! Billing context per tenant: receipt numbering prefix, academic year,
//! ledger currency, timezone, and the default hourly rate for usage-metered
//! enrollments.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for organization billing context
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

/// Database row for an organization
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizationRow {
    pub organization_id: Uuid,
    pub name: String,
    pub receipt_prefix: String,
    pub academic_year: String,
    pub timezone: String,
    pub currency: String,
    pub default_hourly_rate: Option<Decimal>,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches an organization by id
    pub async fn get_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<OrganizationRow, DatabaseError> {
        sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT organization_id, name, receipt_prefix, academic_year,
                   timezone, currency, default_hourly_rate
            FROM organizations WHERE organization_id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Organization", organization_id))
    }
}
