use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::orders::{CartQuote, CartQuoteRequest};
use crate::utils::AppResult;

/// POST /api/cart/quote
pub async fn quote(
    State(state): State<ServerState>,
    Json(payload): Json<CartQuoteRequest>,
) -> AppResult<Json<CartQuote>> {
    Ok(Json(state.builder.quote(payload).await?))
}
