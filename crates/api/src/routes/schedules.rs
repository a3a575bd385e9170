//! Report schedule endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::CreateScheduleRequest;
use persistence::entities::ScheduleEntity;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::report_generation::ReportError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleResponse {
    pub id: i64,
    pub org_unit_id: Uuid,
    pub report_type: String,
    pub day_of_period: i32,
    pub time_of_day: String,
    pub active: bool,
    pub next_scheduled_at: DateTime<Utc>,
}

impl From<ScheduleEntity> for ScheduleResponse {
    fn from(entity: ScheduleEntity) -> Self {
        Self {
            id: entity.id,
            org_unit_id: entity.org_unit_id,
            report_type: entity.report_type,
            day_of_period: entity.day_of_period,
            time_of_day: entity.time_of_day,
            active: entity.active,
            next_scheduled_at: entity.next_scheduled_at,
        }
    }
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), ApiError> {
    let entity = state
        .reports
        .create_schedule(request)
        .await
        .map_err(map_report_error)?;
    Ok((StatusCode::CREATED, Json(entity.into())))
}

pub async fn activate_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    set_active(&state, id, true).await
}

pub async fn deactivate_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    set_active(&state, id, false).await
}

async fn set_active(
    state: &AppState,
    id: i64,
    active: bool,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let entity = state
        .reports
        .set_schedule_active(id, active)
        .await
        .map_err(map_report_error)?;
    Ok(Json(entity.into()))
}

fn map_report_error(err: ReportError) -> ApiError {
    match err {
        ReportError::Validation(e) => ApiError::Validation(e.to_string()),
        ReportError::NotFound(id) => ApiError::NotFound(format!("schedule {id}")),
        ReportError::Database(e) => e.into(),
        other => ApiError::Internal(other.to_string()),
    }
}
