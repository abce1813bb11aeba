//! Product API 模块 (库存)
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/products/{id}/back-in-stock | POST | 到货提醒订阅 | 无 |
//! | /api/products/{id}/stock | POST | 手工出入库 | 员工 |
//! | /api/products/{id}/stock-movements | GET | 库存流水 | 员工 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", product_routes())
}

fn product_routes() -> Router<ServerState> {
    let public_routes =
        Router::new().route("/{id}/back-in-stock", post(handler::subscribe_back_in_stock));

    let manage_routes = Router::new()
        .route("/{id}/stock", post(handler::record_movement))
        .route("/{id}/stock-movements", get(handler::list_movements))
        .route_layer(middleware::from_fn(require_staff));

    public_routes.merge(manage_routes)
}
