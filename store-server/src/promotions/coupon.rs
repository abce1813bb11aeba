//! Coupon Validator
//!
//! Validation is read-only: coupons carry no redemption counter and stay
//! usable until deactivated or expired.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Coupon, CouponValidation, DiscountType, normalize_coupon_code};
use sqlx::SqlitePool;

use crate::db::repository::coupon as coupon_repo;
use crate::money::{clamp_discount, percent_of, to_decimal, to_f64};
use crate::utils::validation::validate_amount;

/// Evaluate a loaded coupon against a cart total.
///
/// Checks run in order: active, not expired (`expiration_date < now`),
/// minimum amount. Discount is clamped to `[0, cart_total]`.
pub fn evaluate_coupon(coupon: &Coupon, cart_total: f64, now: i64) -> AppResult<CouponValidation> {
    if !coupon.is_active {
        return Err(AppError::new(ErrorCode::CouponInactive).with_detail("code", coupon.code.as_str()));
    }
    if let Some(expiration) = coupon.expiration_date
        && expiration < now
    {
        return Err(AppError::new(ErrorCode::CouponExpired)
            .with_detail("code", coupon.code.as_str())
            .with_detail("expirationDate", expiration));
    }
    if cart_total < coupon.min_order_amount {
        return Err(AppError::new(ErrorCode::CouponMinAmountNotMet)
            .with_detail("code", coupon.code.as_str())
            .with_detail("minOrderAmount", coupon.min_order_amount));
    }

    let total = to_decimal(cart_total);
    let raw = match coupon.discount_type {
        DiscountType::Percentage => percent_of(total, coupon.discount_value),
        DiscountType::Fixed => to_decimal(coupon.discount_value),
    };
    let discount = clamp_discount(raw, total);

    Ok(CouponValidation {
        valid: true,
        discount_amount: to_f64(discount),
        coupon_code: coupon.code.clone(),
        message: "Coupon applied".to_string(),
    })
}

/// Looks coupons up by normalized code and evaluates them
#[derive(Clone)]
pub struct CouponValidator {
    pool: SqlitePool,
}

impl CouponValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn validate(&self, code: &str, cart_total: f64) -> AppResult<CouponValidation> {
        validate_amount(cart_total, "cartTotal")?;
        let normalized = normalize_coupon_code(code);
        if normalized.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "code must not be empty",
            ));
        }

        let coupon = coupon_repo::find_by_code(&self.pool, &normalized)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::CouponNotFound).with_detail("code", normalized.as_str())
            })?;

        let result = evaluate_coupon(&coupon, cart_total, shared::util::now_millis());
        match &result {
            Ok(v) => tracing::debug!(code = %v.coupon_code, discount = v.discount_amount, "Coupon validated"),
            Err(e) => tracing::debug!(code = %normalized, reason = %e, "Coupon rejected"),
        }
        result
    }
}
