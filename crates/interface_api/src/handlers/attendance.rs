//! Attendance handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use infra_db::{AttendanceRepository, EnrollmentRepository};

use super::ensure_same_org;
use crate::auth::OrgContext;
use crate::dto::enrollment::{AttendanceResponse, CheckInRequest, CheckOutRequest, CorrectionRequest};
use crate::error::ApiError;
use crate::AppState;

/// Opens an attendance event at check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(request.subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    if !subject.usage_metered {
        return Err(ApiError::BadRequest(
            "subject is not billed by attendance time".to_string(),
        ));
    }

    let row = AttendanceRepository::new(state.pool.clone())
        .check_in(request.subject_id, request.at.unwrap_or_else(Utc::now))
        .await?;

    Ok(Json(row.into()))
}

/// Completes an attendance event at check-out
pub async fn check_out(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(attendance_id): Path<Uuid>,
    Json(request): Json<CheckOutRequest>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let attendance = AttendanceRepository::new(state.pool.clone());
    let event = attendance.get_event(attendance_id).await?;

    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(event.subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    let row = attendance
        .check_out(attendance_id, request.at.unwrap_or_else(Utc::now))
        .await?;

    Ok(Json(row.into()))
}

/// Records a correction replacing a closed attendance event
pub async fn record_correction(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(attendance_id): Path<Uuid>,
    Json(request): Json<CorrectionRequest>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let attendance = AttendanceRepository::new(state.pool.clone());
    let event = attendance.get_event(attendance_id).await?;

    let enrollments = EnrollmentRepository::new(state.pool.clone());
    let subject = enrollments.get_subject(event.subject_id).await?;
    ensure_same_org(&ctx, subject.organization_id)?;

    let row = attendance
        .record_correction(attendance_id, request.check_in, request.check_out)
        .await?;

    Ok(Json(row.into()))
}
