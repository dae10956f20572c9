use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(handlers::stats))
        .route("/admin/users", get(handlers::list_users))
        .route(
            "/admin/users/:id",
            get(handlers::user_details)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/admin/projects", get(handlers::list_projects))
        .route(
            "/admin/projects/:id",
            axum::routing::put(handlers::update_project).delete(handlers::delete_project),
        )
        .route("/admin/search", get(handlers::global_search))
}
