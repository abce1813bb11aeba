//! Cart API 模块
//!
//! 结算预览：与下单使用同一套定价逻辑，但不落库。

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/cart/quote", post(handler::quote))
}
