//! Payment ledger handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use domain_billing::{ChargeCategory, PaymentMode};
use infra_db::{
    repositories::payments::NewPayment, EnrollmentRepository, OrganizationRepository,
    PaymentRepository,
};

use super::ensure_same_org;
use crate::auth::OrgContext;
use crate::dto::billing::{
    BackfillResponse, PaymentResponse, ReceiptResponse, RecordPaymentRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// Records a payment, settling a schedule item when referenced
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if request.amount <= Decimal::ZERO {
        return Err(ApiError::Validation(format!(
            "payment amount must be positive, got {}",
            request.amount
        )));
    }
    if PaymentMode::parse(&request.mode).is_none() {
        return Err(ApiError::Validation(format!(
            "unknown payment mode '{}'",
            request.mode
        )));
    }
    if ChargeCategory::parse(&request.category).is_none() {
        return Err(ApiError::Validation(format!(
            "unknown charge category '{}'",
            request.category
        )));
    }

    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(request.subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(subject.organization_id)
        .await?;

    let payments = PaymentRepository::new(state.pool.clone());
    let row = payments
        .record_payment(NewPayment {
            subject_id: request.subject_id,
            organization_id: subject.organization_id,
            amount: request.amount,
            discount: request.discount,
            currency: org.currency,
            paid_on: request.paid_on.unwrap_or_else(|| Utc::now().date_naive()),
            mode: request.mode,
            category: request.category,
            schedule_item_id: request.schedule_item_id,
            transaction_ref: request.transaction_ref,
            completed: request.completed.unwrap_or(true),
        })
        .await?;

    state
        .cache
        .invalidate_organization(subject.organization_id)
        .await;

    Ok(Json(row.into()))
}

/// Issues (or re-reads) the receipt number for a payment
///
/// Idempotent: repeated calls return the same number.
pub async fn issue_receipt(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let payments = PaymentRepository::new(state.pool.clone());
    let payment = payments.get_payment(payment_id).await?;
    ensure_same_org(&ctx, payment.organization_id)?;

    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(payment.organization_id)
        .await?;

    let receipt_no = payments
        .issue_receipt(payment_id, &org.receipt_prefix, &org.academic_year)
        .await?;

    Ok(Json(ReceiptResponse {
        payment_id,
        receipt_no,
    }))
}

/// Backfill sweep: numbers every receipt-less payment of the organization
pub async fn backfill_receipts(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
) -> Result<Json<BackfillResponse>, ApiError> {
    let organization_id = Uuid::from(ctx.organization_id);
    let org = OrganizationRepository::new(state.pool.clone())
        .get_organization(organization_id)
        .await?;

    let payments = PaymentRepository::new(state.pool.clone());
    let backfilled = payments
        .backfill_missing_receipts(organization_id, &org.receipt_prefix, &org.academic_year)
        .await?;

    Ok(Json(BackfillResponse { backfilled }))
}

/// Transitions a pending payment to completed
pub async fn complete_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payments = PaymentRepository::new(state.pool.clone());
    let payment = payments.get_payment(payment_id).await?;
    ensure_same_org(&ctx, payment.organization_id)?;

    payments.complete_payment(payment_id).await?;
    state
        .cache
        .invalidate_organization(payment.organization_id)
        .await;

    let row = payments.get_payment(payment_id).await?;
    Ok(Json(row.into()))
}
