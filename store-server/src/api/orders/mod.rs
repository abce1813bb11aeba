//! Order API Module
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/orders | POST | 下单 (令牌可选) | 可选 |
//! | /api/orders | GET | 我的订单 | 登录 |
//! | /api/orders/track/{pickup_code} | GET | 取件码查询 | 无 |
//! | /api/orders/{id} | GET | 订单详情 | 本人或员工 |
//! | /api/orders/{id}/cancel | PUT | 顾客取消 | 本人 |
//! | /api/orders/manage | GET | 订单列表 | 员工 |
//! | /api/orders/{id}/status | PUT | 状态流转 | 员工 |
//! | /api/orders/verify-code | POST | 取件核验 | 员工 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    let customer_routes = Router::new()
        .route("/", post(handler::create).get(handler::list_mine))
        .route("/track/{pickup_code}", get(handler::track))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", put(handler::cancel));

    let staff_routes = Router::new()
        .route("/manage", get(handler::list_all))
        .route("/{id}/status", put(handler::update_status))
        .route("/verify-code", post(handler::verify_code))
        .route_layer(middleware::from_fn(require_staff));

    customer_routes.merge(staff_routes)
}
