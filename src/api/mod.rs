// src/api/mod.rs
// Admin HTTP API

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use handlers::{
    add_member, create_role, delete_role, health_handler, list_projects, list_roles, update_role,
};

/// Router with every admin endpoint, state already applied
pub fn router(app_state: Arc<AppState>) -> Router {
    let api: Router<Arc<AppState>> = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/{project_id}/roles", get(list_roles).post(create_role))
        .route(
            "/projects/{project_id}/roles/{role_id}",
            put(update_role).delete(delete_role),
        )
        .route("/projects/{project_id}/members", post(add_member));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(app_state)
}
