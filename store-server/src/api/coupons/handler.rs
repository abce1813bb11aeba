//! Coupon API Handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use shared::models::{Coupon, CouponCreate, CouponValidation};

use crate::core::ServerState;
use crate::promotions;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    pub cart_total: f64,
}

/// POST /api/coupons/validate
pub async fn validate(
    State(state): State<ServerState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> AppResult<Json<CouponValidation>> {
    let result = state
        .coupons
        .validate(&payload.code, payload.cart_total)
        .await?;
    Ok(Json(result))
}

/// POST /api/coupons
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CouponCreate>,
) -> AppResult<(StatusCode, Json<Coupon>)> {
    let coupon = promotions::create_coupon(&state.pool, payload).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}
