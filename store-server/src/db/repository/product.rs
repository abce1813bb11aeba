//! Product Repository

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate};
use sqlx::{SqliteConnection, SqlitePool};

const PRODUCT_SELECT: &str = "SELECT id, name, description, price, stock, low_stock_threshold, category_id, is_deleted, created_at, updated_at FROM product";

const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Stock snapshot returned by [`adjust_stock`]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockRow {
    pub name: String,
    pub stock: i64,
    pub low_stock_threshold: i64,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO product (id, name, description, price, stock, low_stock_threshold, category_id, is_deleted, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock.unwrap_or(0))
    .bind(data.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD))
    .bind(data.category_id)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM product WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Atomically apply `delta` to a product's stock.
///
/// With `non_negative` the update is skipped when the result would drop
/// below zero. Returns `None` when no row was updated (missing product, or
/// guard rejected the change).
pub async fn adjust_stock(
    conn: &mut SqliteConnection,
    id: i64,
    delta: i64,
    non_negative: bool,
) -> RepoResult<Option<StockRow>> {
    let now = shared::util::now_millis();
    let sql = if non_negative {
        "UPDATE product SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 AND stock + ?1 >= 0 RETURNING name, stock, low_stock_threshold"
    } else {
        "UPDATE product SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 RETURNING name, stock, low_stock_threshold"
    };
    let row = sqlx::query_as::<_, StockRow>(sql)
        .bind(delta)
        .bind(now)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Soft delete
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE product SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
