use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod gate;
pub mod handlers;
pub mod policy;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscription/me", get(handlers::subscription_info))
        .route("/subscription/checkout", post(handlers::create_checkout))
        .route("/subscription/upgrade", post(handlers::upgrade))
        .route("/subscription/cancel", post(handlers::cancel))
}
