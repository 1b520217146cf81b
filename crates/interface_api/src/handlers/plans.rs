//! Plan lifecycle handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Money, OrganizationId, SubjectId};
use domain_billing::{BillingPlan, InstallmentFrequency, PlanParams, PlanTerms};
use infra_db::{
    repositories::payments::NewPayment, EnrollmentRepository, OrganizationRepository,
    PaymentRepository, PlanRepository,
};

use super::{ensure_same_org, parse_currency};
use crate::auth::OrgContext;
use crate::dto::billing::{CreatePlanRequest, PlanResponse};
use crate::error::ApiError;
use crate::AppState;

fn parse_frequency(label: Option<&str>) -> Result<InstallmentFrequency, ApiError> {
    match label.unwrap_or("monthly") {
        "monthly" => Ok(InstallmentFrequency::Monthly),
        "quarterly" => Ok(InstallmentFrequency::Quarterly),
        other => Err(ApiError::Validation(format!(
            "unknown installment frequency '{other}'"
        ))),
    }
}

fn build_terms(request: &CreatePlanRequest, currency: core_kernel::Currency) -> Result<PlanTerms, ApiError> {
    match request.plan_kind.as_str() {
        "installment" => {
            let total = request.total_amount.ok_or_else(|| {
                ApiError::Validation("total_amount is required for installment plans".to_string())
            })?;
            let count = request.installment_count.ok_or_else(|| {
                ApiError::Validation(
                    "installment_count is required for installment plans".to_string(),
                )
            })?;
            Ok(PlanTerms::Installment {
                total_amount: Money::new(total, currency),
                installment_count: count,
                frequency: parse_frequency(request.frequency.as_deref())?,
            })
        }
        "usage_metered" => {
            let hourly_rate = request.hourly_rate.ok_or_else(|| {
                ApiError::Validation("hourly_rate is required for usage-metered plans".to_string())
            })?;
            let committed_hours = request.committed_hours.ok_or_else(|| {
                ApiError::Validation(
                    "committed_hours is required for usage-metered plans".to_string(),
                )
            })?;
            Ok(PlanTerms::UsageMetered {
                hourly_rate: Money::new(hourly_rate, currency),
                committed_hours,
            })
        }
        other => Err(ApiError::Validation(format!("unknown plan kind '{other}'"))),
    }
}

/// Creates a billing plan (and its schedule) for a subject
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(subject_id): Path<Uuid>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(subject.organization_id)
        .await?;
    let currency = parse_currency(&org.currency)?;

    let params = PlanParams {
        subject_id: SubjectId::from(subject_id),
        organization_id: OrganizationId::from(subject.organization_id),
        terms: build_terms(&request, currency)?,
        start_date: request.start_date,
        end_date: request.end_date,
        registration_fee: request.registration_fee.map(|fee| Money::new(fee, currency)),
    };

    let (plan, initial_bill) = BillingPlan::create(params)?;

    let plans = PlanRepository::new(state.pool.clone());
    plans.create_plan_with_schedule(&plan).await?;

    // The initial registration bill enters the ledger in pending status
    let mut initial_bill_id = None;
    if let Some(bill) = initial_bill {
        let payments = PaymentRepository::new(state.pool.clone());
        let row = payments
            .record_payment(NewPayment {
                subject_id,
                organization_id: subject.organization_id,
                amount: bill.amount.amount(),
                discount: None,
                currency: org.currency.clone(),
                paid_on: bill.paid_on,
                mode: bill.mode.as_str().to_string(),
                category: bill.category.as_str().to_string(),
                schedule_item_id: None,
                transaction_ref: None,
                completed: false,
            })
            .await?;
        initial_bill_id = Some(row.payment_id);
    }

    state
        .cache
        .invalidate_organization(subject.organization_id)
        .await;

    let plan_row = plans.get_plan(Uuid::from(plan.id())).await?;
    let schedule = plans.schedule_for_plan(plan_row.plan_id).await?;
    Ok(Json(PlanResponse::from_rows(plan_row, schedule, initial_bill_id)))
}

/// Cancels a plan; fails while collected money references it
pub async fn cancel_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanResponse>, ApiError> {
    let plans = PlanRepository::new(state.pool.clone());
    let plan = plans.get_plan(plan_id).await?;
    ensure_same_org(&ctx, plan.organization_id)?;

    plans.cancel_plan(plan_id).await?;
    state
        .cache
        .invalidate_organization(plan.organization_id)
        .await;

    let plan_row = plans.get_plan(plan_id).await?;
    let schedule = plans.schedule_for_plan(plan_id).await?;
    Ok(Json(PlanResponse::from_rows(plan_row, schedule, None)))
}

/// Fetches a plan with its schedule
pub async fn get_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanResponse>, ApiError> {
    let plans = PlanRepository::new(state.pool.clone());
    let plan = plans.get_plan(plan_id).await?;
    ensure_same_org(&ctx, plan.organization_id)?;

    let schedule = plans.schedule_for_plan(plan_id).await?;
    Ok(Json(PlanResponse::from_rows(plan, schedule, None)))
}
