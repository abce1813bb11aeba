//! Campaign API 模块

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/campaigns", routes())
}

fn routes() -> Router<ServerState> {
    let public_routes = Router::new().route("/public", get(handler::list_public));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route_layer(middleware::from_fn(require_staff));

    public_routes.merge(manage_routes)
}
