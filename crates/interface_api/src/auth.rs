//! Authentication and organization context
//!
//! Session management lives outside this engine; here a JWT is only the
//! carrier of the caller's organization id. Every billing operation is
//! rejected when that context cannot be resolved.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::OrganizationId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Caller's organization id
    pub org: Option<String>,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// The resolved organization scope of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgContext {
    pub organization_id: OrganizationId,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing organization context")]
    MissingOrganization,
}

/// Creates a new JWT token
pub fn create_token(
    user_id: &str,
    organization_id: OrganizationId,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        org: Some(Uuid::from(organization_id).to_string()),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            AuthError::TokenExpired
        } else {
            AuthError::InvalidToken
        }
    })?;

    Ok(token_data.claims)
}

/// Resolves the organization context from validated claims
///
/// # Errors
///
/// Returns `MissingOrganization` when the claims carry no parseable
/// organization id; callers translate this into an Unauthorized response.
pub fn resolve_organization(claims: &Claims) -> Result<OrgContext, AuthError> {
    let org = claims.org.as_deref().ok_or(AuthError::MissingOrganization)?;
    let organization_id = org
        .parse::<Uuid>()
        .map(OrganizationId::from)
        .map_err(|_| AuthError::MissingOrganization)?;
    Ok(OrgContext { organization_id })
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Permission definitions
pub mod permissions {
    pub const PLAN_READ: &str = "plan:read";
    pub const PLAN_WRITE: &str = "plan:write";
    pub const PAYMENT_READ: &str = "payment:read";
    pub const PAYMENT_WRITE: &str = "payment:write";
    pub const ATTENDANCE_WRITE: &str = "attendance:write";
    pub const REPORT_READ: &str = "report:read";
}
