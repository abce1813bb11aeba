//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::models::{
    CreateOrderRequest, Order, OrderDetail, OrderStatus, OrderTracking, UpdateOrderStatusRequest,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::types::PaginationParams;
use crate::utils::{AppError, AppResult, ErrorCode};

#[derive(Debug, Deserialize)]
pub struct ManageQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub pickup_code: String,
}

/// POST /api/orders - 下单，携带令牌时关联到用户
pub async fn create(
    State(state): State<ServerState>,
    user: Option<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderDetail>)> {
    let detail = state
        .builder
        .create_order(payload, user.map(|u| u.id))
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/orders - 当前用户的订单
pub async fn list_mine(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_for_user(user.id).await?))
}

/// GET /api/orders/track/{pickup_code}
pub async fn track(
    State(state): State<ServerState>,
    Path(pickup_code): Path<String>,
) -> AppResult<Json<OrderTracking>> {
    Ok(Json(state.orders.track(&pickup_code).await?))
}

/// GET /api/orders/{id} - 本人或员工可见
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state.orders.get(id).await?;
    if !user.is_staff() && detail.order.user_id != Some(user.id) {
        return Err(AppError::permission_denied("Not your order").with_detail("orderId", id));
    }
    Ok(Json(detail))
}

/// PUT /api/orders/{id}/cancel - 顾客取消 (仅 PENDING)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state
        .orders
        .cancel_by_customer(id, user.id, payload.reason)
        .await?;
    Ok(Json(detail))
}

/// GET /api/orders/manage?status=&limit=&offset=
pub async fn list_all(
    State(state): State<ServerState>,
    Query(query): Query<ManageQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let page = PaginationParams {
        limit: query.limit,
        offset: query.offset,
    };
    let orders = state
        .orders
        .list(query.status, page.limit(), page.offset())
        .await?;
    Ok(Json(orders))
}

/// PUT /api/orders/{id}/status
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<OrderDetail>> {
    let detail = state
        .orders
        .update_status(id, payload.status, Some(user.id), payload.note)
        .await?;
    Ok(Json(detail))
}

/// POST /api/orders/verify-code
pub async fn verify_code(
    State(state): State<ServerState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> AppResult<Json<OrderDetail>> {
    if payload.pickup_code.trim().is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "pickupCode is required",
        ));
    }
    Ok(Json(state.orders.verify_pickup_code(&payload.pickup_code).await?))
}
