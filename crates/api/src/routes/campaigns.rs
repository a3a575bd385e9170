//! Campaign endpoints: creation and lifecycle gates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::{CampaignCounters, CampaignStatus, CreateCampaignRequest};
use persistence::entities::CampaignEntity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::campaign_dispatch::CampaignError;

#[derive(Debug, Deserialize)]
pub struct CreateCampaignBody {
    pub created_by: Uuid,
    #[serde(flatten)]
    pub campaign: CreateCampaignRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CampaignResponse {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub counters: CampaignCounters,
}

impl From<CampaignEntity> for CampaignResponse {
    fn from(entity: CampaignEntity) -> Self {
        let counters = entity.counters();
        Self {
            id: entity.id,
            name: entity.name,
            subject: entity.subject,
            status: entity.status,
            scheduled_at: entity.scheduled_at,
            counters,
        }
    }
}

pub async fn create_campaign(
    State(state): State<AppState>,
    Json(body): Json<CreateCampaignBody>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    let entity = state
        .campaigns
        .create_campaign(body.created_by, body.campaign)
        .await
        .map_err(map_campaign_error)?;
    Ok((StatusCode::CREATED, Json(entity.into())))
}

pub async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    transition(&state, id, CampaignStatus::Sending, CampaignStatus::Paused).await
}

pub async fn resume_campaign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    transition(&state, id, CampaignStatus::Paused, CampaignStatus::Sending).await
}

/// Cancel is allowed from any non-terminal state, tried in order.
pub async fn cancel_campaign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    for from in [
        CampaignStatus::Draft,
        CampaignStatus::Scheduled,
        CampaignStatus::Sending,
        CampaignStatus::Paused,
    ] {
        match state
            .campaigns
            .transition(id, from, CampaignStatus::Cancelled)
            .await
        {
            Ok(entity) => return Ok(Json(entity.into())),
            Err(CampaignError::IllegalTransition { .. }) => continue,
            Err(other) => return Err(map_campaign_error(other)),
        }
    }
    Err(ApiError::Conflict(format!(
        "campaign {id} is already in a terminal state"
    )))
}

async fn transition(
    state: &AppState,
    id: i64,
    from: CampaignStatus,
    to: CampaignStatus,
) -> Result<Json<CampaignResponse>, ApiError> {
    state
        .campaigns
        .transition(id, from, to)
        .await
        .map(|entity| Json(entity.into()))
        .map_err(map_campaign_error)
}

fn map_campaign_error(err: CampaignError) -> ApiError {
    match err {
        CampaignError::Validation(e) => ApiError::Validation(e.to_string()),
        CampaignError::NotFound(id) => ApiError::NotFound(format!("campaign {id}")),
        CampaignError::IllegalTransition { id, from, to } => {
            ApiError::Conflict(format!("campaign {id} cannot go from {from} to {to}"))
        }
        CampaignError::Database(e) => e.into(),
    }
}
