//! Reconciliation trigger handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use domain_reconciliation::ReconciliationJob;
use infra_db::EnrollmentRepository;

use crate::adapters::LogNotificationSink;
use crate::dto::billing::{ReconciliationQuery, ReconciliationResponse};
use crate::error::ApiError;
use crate::middleware::verify_reconciliation_secret;
use crate::AppState;

/// Runs the daily reconciliation pass
///
/// Authenticated by the deployment's shared secret, not a user session;
/// safe to re-run for the same day thanks to the per-day dedupe keys.
pub async fn run_reconciliation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReconciliationQuery>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    if !verify_reconciliation_secret(&headers, &state.config.reconciliation_secret) {
        return Err(ApiError::Unauthorized);
    }

    let directory = Arc::new(EnrollmentRepository::new(state.pool.clone()));
    let sink = Arc::new(LogNotificationSink::new());
    let job = ReconciliationJob::new(directory, sink);

    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let report = job.run(today).await?;

    Ok(Json(ReconciliationResponse {
        expiring_notified: report.expiring_notified,
        expired: report.expired,
        overdue_notified: report.overdue_notified,
        failures: report.failures.len() as u32,
    }))
}
