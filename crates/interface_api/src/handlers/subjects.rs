//! Subject handlers: financial snapshot, usage charge, removal

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::{Money, ReportingMonth};
use domain_billing::{compute_snapshot, FinancialSnapshot, SnapshotInputs};
use domain_enrollment::{ensure_no_financial_obligations, monthly_charge, resolve_hourly_rate};
use infra_db::{
    repositories::attendance::month_scan_window, AttendanceRepository, EnrollmentRepository,
    OrganizationRepository, PaymentRepository, PlanRepository,
};

use super::{ensure_same_org, parse_currency, parse_timezone};
use crate::auth::OrgContext;
use crate::dto::billing::{SnapshotResponse, UsageChargeQuery, UsageChargeResponse};
use crate::error::ApiError;
use crate::AppState;

fn snapshot_response(subject_id: Uuid, snapshot: FinancialSnapshot, cached: bool) -> SnapshotResponse {
    SnapshotResponse {
        subject_id,
        expected: snapshot.expected.amount(),
        collected_tuition: snapshot.collected_tuition.amount(),
        collected_additional: snapshot.collected_additional.amount(),
        total_due: snapshot.total_due.amount(),
        status: snapshot.status.as_str().to_string(),
        next_due_date: snapshot.next_due_date,
        overdue_count: snapshot.overdue_count,
        cached,
    }
}

/// Computes (or serves from cache) the subject's financial snapshot
pub async fn get_snapshot(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    if let Some(snapshot) = state.cache.get(subject.organization_id, subject_id).await {
        return Ok(Json(snapshot_response(subject_id, snapshot, true)));
    }

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(subject.organization_id)
        .await?;
    let currency = parse_currency(&org.currency)?;
    let timezone = parse_timezone(&org.timezone);

    let plans = PlanRepository::new(state.pool.clone());
    let custom_plan_total = plans
        .find_current_plan(subject_id)
        .await?
        .map(|plan| Money::new(plan.total_amount, currency));

    let schedule: Vec<_> = plans
        .schedule_for_subject(subject_id)
        .await?
        .into_iter()
        .map(|row| row.into_domain(currency))
        .collect();

    let payments: Vec<_> = PaymentRepository::new(state.pool.clone())
        .completed_for_subject(subject_id)
        .await?
        .into_iter()
        .map(|row| row.into_domain(currency))
        .collect();

    let catalog_charges = state
        .catalog
        .get_applicable_charges(&subject.program_class, None)
        .await?;

    let snapshot = compute_snapshot(SnapshotInputs {
        catalog_charges: &catalog_charges,
        custom_plan_total,
        payments: &payments,
        schedule: &schedule,
        today: timezone.local_date(Utc::now()),
        currency,
    })?;

    state
        .cache
        .put(subject.organization_id, subject_id, snapshot.clone())
        .await;

    Ok(Json(snapshot_response(subject_id, snapshot, false)))
}

/// Computes the metered charge for one reporting month
pub async fn get_usage_charge(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(subject_id): Path<Uuid>,
    Query(query): Query<UsageChargeQuery>,
) -> Result<Json<UsageChargeResponse>, ApiError> {
    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    if !subject.usage_metered {
        return Err(ApiError::BadRequest(
            "subject is not billed by attendance time".to_string(),
        ));
    }

    let month = ReportingMonth::new(query.year, query.month)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(subject.organization_id)
        .await?;
    let currency = parse_currency(&org.currency)?;
    let timezone = parse_timezone(&org.timezone);

    let custom_rate = subject
        .custom_hourly_rate
        .map(|rate| Money::new(rate, currency));
    let default_rate = org
        .default_hourly_rate
        .map(|rate| Money::new(rate, currency));
    let hourly_rate = match default_rate {
        Some(default) => resolve_hourly_rate(custom_rate, default),
        None => custom_rate.ok_or_else(|| {
            ApiError::Conflict(
                "no hourly rate configured for subject or organization".to_string(),
            )
        })?,
    };

    let (from, to) = month_scan_window(month.first_day(), month.last_day());
    let events: Vec<_> = AttendanceRepository::new(state.pool.clone())
        .events_in_window(subject_id, from, to)
        .await?
        .into_iter()
        .map(|row| row.into_event())
        .collect();

    let charge = monthly_charge(&events, month, hourly_rate, &timezone)?;

    Ok(Json(UsageChargeResponse {
        subject_id,
        year: month.year(),
        month: month.month(),
        hourly_rate: hourly_rate.amount(),
        charge: charge.amount(),
        currency: currency.code().to_string(),
    }))
}

/// Removes a subject
///
/// Blocked with structured detail while unpaid schedule items or an active
/// plan exist; the caller must settle or cancel first.
pub async fn delete_subject(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(subject.organization_id)
        .await?;
    let currency = parse_currency(&org.currency)?;

    let summary = enrollments.obligation_summary(subject_id, currency).await?;
    ensure_no_financial_obligations(core_kernel::SubjectId::from(subject_id), &summary)?;

    enrollments.delete_subject(subject_id).await?;
    state
        .cache
        .invalidate_organization(subject.organization_id)
        .await;

    Ok(Json(serde_json::json!({ "deleted": subject_id })))
}
