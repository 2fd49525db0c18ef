pub mod dto;
pub mod handlers;
pub mod policy;
pub mod repo;
pub mod update;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/avatar",
            post(handlers::upload_avatar).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
}
