use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use aidlink_types::api::{DonateRequest, NewCampaign};
use aidlink_types::models::CampaignStatus;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct CampaignQuery {
    pub status: Option<CampaignStatus>,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<NewCampaign>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = blocking(&state, move |e| e.submit_campaign(req)).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.list_campaigns(query.status)).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.get_campaign(campaign_id)).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.approve_campaign(campaign_id)).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.reject_campaign(campaign_id)).await?))
}

pub async fn progress(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.get_campaign_progress(campaign_id)).await?))
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.campaign_transactions(campaign_id)).await?))
}

pub async fn audit(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.verify_ledger(campaign_id)).await?))
}

pub async fn donate(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(req): Json<DonateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = blocking(&state, move |e| {
        e.donate(campaign_id, req.donor_id, req.amount, req.is_anonymous)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
