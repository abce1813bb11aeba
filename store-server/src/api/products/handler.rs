//! Product Stock Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::models::{
    BackInStockSubscribe, BackInStockSubscription, StockMovement, StockMovementCreate,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::inventory::StockMovementInput;
use crate::utils::AppResult;
use crate::utils::types::PaginationParams;

/// POST /api/products/{id}/stock - 手工出入库
pub async fn record_movement(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StockMovementCreate>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let input = StockMovementInput::manual(id, payload, user.id)?;
    let change = state.ledger.record_movement(input).await?;
    Ok((StatusCode::CREATED, Json(change.movement)))
}

/// GET /api/products/{id}/stock-movements
pub async fn list_movements(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let movements = state
        .ledger
        .list_movements(id, page.limit(), page.offset())
        .await?;
    Ok(Json(movements))
}

/// POST /api/products/{id}/back-in-stock
pub async fn subscribe_back_in_stock(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<BackInStockSubscribe>,
) -> AppResult<(StatusCode, Json<BackInStockSubscription>)> {
    let sub = state.ledger.subscribe_back_in_stock(id, payload).await?;
    Ok((StatusCode::CREATED, Json(sub)))
}
