use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email/bulk", post(handlers::bulk_email))
        .route("/email/templates", get(handlers::templates))
}
