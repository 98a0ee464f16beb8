use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use aidlink_types::api::RegisterUserRequest;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |e| e.register_user(&req.name, &req.email, req.role)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.get_user(user_id)).await?))
}

pub async fn donation_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.donation_history(user_id)).await?))
}

pub async fn user_requests(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.list_requests_by_user(user_id)).await?))
}
