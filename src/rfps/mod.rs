use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rfps", get(handlers::list_rfps).post(handlers::create_rfp))
        .route("/rfps/my", get(handlers::my_rfps))
        .route(
            "/rfps/:id",
            get(handlers::get_rfp)
                .put(handlers::update_rfp)
                .delete(handlers::delete_rfp),
        )
        .route("/rfps/:id/publish", post(handlers::publish_rfp))
        .route("/rfps/:id/close", post(handlers::close_rfp))
}
