use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Target of the QR code printed on an anonymous donation receipt.
pub async fn lookup(
    State(state): State<AppState>,
    Path(qr_code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, move |e| e.lookup_impact(&qr_code)).await?))
}

pub async fn analytics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(blocking(&state, |e| e.analytics()).await?))
}
