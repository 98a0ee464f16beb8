use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use aidlink_types::api::{
    AcceptBody, ApproveRequestBody, NearbyQuery, NewRequest, RejectRequestBody, SanctionBody,
    UploadProofBody,
};
use aidlink_types::models::{GeoPoint, RequestStatus};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<NewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = blocking(&state, move |e| e.submit_request(req)).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RequestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.list_requests(query.status)).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.get_request(request_id)).await?))
}

/// Responds with the beneficiary's one-time password. It is not retrievable
/// again afterwards.
pub async fn approve(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<ApproveRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        blocking(&state, move |e| e.approve_request(request_id, body.admin_id)).await?,
    ))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<RejectRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        blocking(&state, move |e| e.reject_request(request_id, body.admin_id, &body.reason))
            .await?,
    ))
}

pub async fn upload_proof(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<UploadProofBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = blocking(&state, move |e| e.upload_proof(request_id, &body.proof_ref)).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn sanction(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<SanctionBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        blocking(&state, move |e| e.sanction_request(request_id, body.amount)).await?,
    ))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<AcceptBody>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        blocking(&state, move |e| e.accept_request(request_id, body.helper_id)).await?,
    ))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.complete_request(request_id)).await?))
}

pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let origin = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };
    let radius_km = query.radius_km.unwrap_or(state.default_radius_km);
    let category = query.category;
    Ok(Json(
        blocking(&state, move |e| {
            e.find_nearby_requests(origin, radius_km, category.as_deref())
        })
        .await?,
    ))
}
