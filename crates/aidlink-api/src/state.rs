use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use aidlink_core::Engine;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Arc<Engine>,
    /// Used by the nearby search when the caller sends no radius.
    pub default_radius_km: f64,
}

impl AppStateInner {
    pub fn new(engine: Arc<Engine>, default_radius_km: f64) -> AppState {
        Arc::new(Self {
            engine,
            default_radius_km,
        })
    }
}

/// Run an engine call off the async runtime. Every engine method touches
/// SQLite, and approvals also run Argon2.
pub async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> aidlink_core::Result<T> + Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .map_err(ApiError::Core)
}
