//! Coupon Model

use serde::{Deserialize, Serialize};

/// Coupon discount type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountType {
    /// value 为百分比 (10 = 10%)
    Percentage,
    /// value 为固定金额
    Fixed,
}

/// Coupon entity
///
/// 可重复使用，直到停用或过期（无使用次数计数）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    /// Stored uppercase
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_amount: f64,
    /// Unix millis, None = never expires
    pub expiration_date: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create coupon payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponCreate {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_amount: Option<f64>,
    pub expiration_date: Option<i64>,
    pub is_active: Option<bool>,
}

/// Coupon validation result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    pub discount_amount: f64,
    pub coupon_code: String,
    pub message: String,
}

/// Normalize a user-entered code for storage and lookup
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}
