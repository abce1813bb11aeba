//! Coupon API 模块
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/coupons/validate | POST | 验证优惠券 | 无 |
//! | /api/coupons | POST | 创建优惠券 | 员工 |

mod handler;

use axum::{Router, middleware, routing::post};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/coupons", routes())
}

fn routes() -> Router<ServerState> {
    let public_routes = Router::new().route("/validate", post(handler::validate));

    let manage_routes = Router::new()
        .route("/", post(handler::create))
        .route_layer(middleware::from_fn(require_staff));

    public_routes.merge(manage_routes)
}
