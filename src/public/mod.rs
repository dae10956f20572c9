use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/public/stats", get(handlers::public_stats))
        .route("/public/featured-projects", get(handlers::featured_projects))
        .route("/public/recent-activity", get(handlers::recent_activity))
}
