//! JSON routes over the engine. Handlers only translate; every rule lives
//! in `aidlink-core`.

pub mod campaigns;
pub mod error;
pub mod impact;
pub mod requests;
pub mod state;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/donations", get(users::donation_history))
        .route("/users/{user_id}/requests", get(users::user_requests))
        .route("/campaigns", get(campaigns::list).post(campaigns::submit))
        .route("/campaigns/{campaign_id}", get(campaigns::get))
        .route("/campaigns/{campaign_id}/approve", post(campaigns::approve))
        .route("/campaigns/{campaign_id}/reject", post(campaigns::reject))
        .route("/campaigns/{campaign_id}/progress", get(campaigns::progress))
        .route("/campaigns/{campaign_id}/donations", post(campaigns::donate))
        .route("/campaigns/{campaign_id}/transactions", get(campaigns::transactions))
        .route("/campaigns/{campaign_id}/audit", get(campaigns::audit))
        .route("/impact/{qr_code}", get(impact::lookup))
        .route("/analytics", get(impact::analytics))
        .route("/requests", get(requests::list).post(requests::submit))
        .route("/requests/nearby", get(requests::nearby))
        .route("/requests/{request_id}", get(requests::get))
        .route("/requests/{request_id}/approve", post(requests::approve))
        .route("/requests/{request_id}/reject", post(requests::reject))
        .route("/requests/{request_id}/proofs", post(requests::upload_proof))
        .route("/requests/{request_id}/sanction", post(requests::sanction))
        .route("/requests/{request_id}/accept", post(requests::accept))
        .route("/requests/{request_id}/complete", post(requests::complete))
        .with_state(state)
}
