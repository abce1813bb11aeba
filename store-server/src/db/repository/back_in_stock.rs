//! Back-in-stock Subscription Repository

use super::RepoResult;
use shared::models::BackInStockSubscription;
use sqlx::SqlitePool;

pub async fn create(
    pool: &SqlitePool,
    product_id: i64,
    phone_number: Option<&str>,
    email: Option<&str>,
) -> RepoResult<BackInStockSubscription> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO back_in_stock_subscription (product_id, phone_number, email, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
    )
    .bind(product_id)
    .bind(phone_number)
    .bind(email)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(BackInStockSubscription {
        id,
        product_id,
        phone_number: phone_number.map(str::to_string),
        email: email.map(str::to_string),
        created_at: now,
    })
}

/// Remove and return every subscription for a product (one-shot notification).
///
/// A single `DELETE .. RETURNING`, so a subscription added concurrently is
/// either returned here or left for the next restock.
pub async fn take_for_product(
    pool: &SqlitePool,
    product_id: i64,
) -> RepoResult<Vec<BackInStockSubscription>> {
    let mut rows = sqlx::query_as::<_, BackInStockSubscription>(
        "DELETE FROM back_in_stock_subscription WHERE product_id = ? RETURNING id, product_id, phone_number, email, created_at",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    // RETURNING 不保证顺序
    rows.sort_by_key(|s| (s.created_at, s.id));
    Ok(rows)
}
