//! Stock Movement Repository (append-only ledger)

use super::RepoResult;
use shared::models::{StockMovement, StockMovementType};
use sqlx::{SqliteConnection, SqlitePool};

const MOVEMENT_SELECT: &str = "SELECT id, product_id, movement_type, quantity, previous_stock, new_stock, reason, created_by, order_id, created_at FROM stock_movement";

/// Row to append; `id` (rowid) and `created_at` are assigned on insert
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub product_id: i64,
    pub movement_type: StockMovementType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: Option<&'a str>,
    pub created_by: Option<i64>,
    pub order_id: Option<i64>,
}

pub async fn insert(conn: &mut SqliteConnection, m: NewMovement<'_>) -> RepoResult<StockMovement> {
    let now = shared::util::now_millis();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO stock_movement (product_id, movement_type, quantity, previous_stock, new_stock, reason, created_by, order_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
    )
    .bind(m.product_id)
    .bind(m.movement_type)
    .bind(m.quantity)
    .bind(m.previous_stock)
    .bind(m.new_stock)
    .bind(m.reason)
    .bind(m.created_by)
    .bind(m.order_id)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(StockMovement {
        id,
        product_id: m.product_id,
        movement_type: m.movement_type,
        quantity: m.quantity,
        previous_stock: m.previous_stock,
        new_stock: m.new_stock,
        reason: m.reason.map(str::to_string),
        created_by: m.created_by,
        order_id: m.order_id,
        created_at: now,
    })
}

/// Newest first
pub async fn list_by_product(
    pool: &SqlitePool,
    product_id: i64,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<StockMovement>> {
    let sql = format!(
        "{MOVEMENT_SELECT} WHERE product_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, StockMovement>(&sql)
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<StockMovement>> {
    let sql = format!("{MOVEMENT_SELECT} WHERE order_id = ? ORDER BY created_at, id");
    let rows = sqlx::query_as::<_, StockMovement>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
