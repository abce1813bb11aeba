//! Coupon Repository

use super::{RepoError, RepoResult};
use shared::models::{Coupon, CouponCreate};
use sqlx::SqlitePool;

const COUPON_SELECT: &str = "SELECT id, code, discount_type, discount_value, min_order_amount, expiration_date, is_active, created_at FROM coupon";

/// Lookup by already-normalized code
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Coupon>> {
    let sql = format!("{COUPON_SELECT} WHERE code = ?");
    let row = sqlx::query_as::<_, Coupon>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert a coupon. `data.code` must already be normalized.
pub async fn create(pool: &SqlitePool, data: CouponCreate) -> RepoResult<Coupon> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO coupon (id, code, discount_type, discount_value, min_order_amount, expiration_date, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(id)
    .bind(&data.code)
    .bind(data.discount_type)
    .bind(data.discount_value)
    .bind(data.min_order_amount.unwrap_or(0.0))
    .bind(data.expiration_date)
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .execute(pool)
    .await?;
    find_by_code(pool, &data.code)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create coupon".into()))
}
