//! Order Repository
//!
//! Orders are written once at creation and afterwards only through the
//! status-guarded update, so concurrent staff actions cannot both win.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderDetail, OrderItem, OrderStatus, StatusHistoryEntry};
use sqlx::{SqliteConnection, SqlitePool};

const ORDER_SELECT: &str = "SELECT id, user_id, status, pickup_code, subtotal, campaign_discount, discount_amount, total_amount, coupon_code, applied_campaigns, status_history, full_name, phone_number, email, note, changed_by, created_at, updated_at, ready_at, completed_at, cancelled_at FROM orders";

const ITEM_SELECT: &str =
    "SELECT id, order_id, product_id, product_name, quantity, price FROM order_item";

fn to_json<T: serde::Serialize>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|e| RepoError::Database(format!("JSON encode: {e}")))
}

/// Insert an order header and its lines.
///
/// Line ids are assigned by SQLite; the returned lines carry them.
pub async fn insert(
    conn: &mut SqliteConnection,
    order: &Order,
    items: &[OrderItem],
) -> RepoResult<Vec<OrderItem>> {
    sqlx::query(
        "INSERT INTO orders (id, user_id, status, pickup_code, subtotal, campaign_discount, discount_amount, total_amount, coupon_code, applied_campaigns, status_history, full_name, phone_number, email, note, changed_by, created_at, updated_at, ready_at, completed_at, cancelled_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.status)
    .bind(&order.pickup_code)
    .bind(order.subtotal)
    .bind(order.campaign_discount)
    .bind(order.discount_amount)
    .bind(order.total_amount)
    .bind(&order.coupon_code)
    .bind(to_json(&order.applied_campaigns)?)
    .bind(to_json(&order.status_history)?)
    .bind(&order.full_name)
    .bind(&order.phone_number)
    .bind(&order.email)
    .bind(&order.note)
    .bind(order.changed_by)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.ready_at)
    .bind(order.completed_at)
    .bind(order.cancelled_at)
    .execute(&mut *conn)
    .await?;

    let mut saved = Vec::with_capacity(items.len());
    for item in items {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO order_item (order_id, product_id, product_name, quantity, price) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
        )
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.price)
        .fetch_one(&mut *conn)
        .await?;
        saved.push(OrderItem {
            id,
            order_id: order.id,
            ..item.clone()
        });
    }
    Ok(saved)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{ITEM_SELECT} WHERE order_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_detail(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderDetail>> {
    let Some(order) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let items = find_items(pool, order.id).await?;
    Ok(Some(OrderDetail { order, items }))
}

pub async fn find_by_pickup_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<OrderDetail>> {
    let sql = format!("{ORDER_SELECT} WHERE pickup_code = ?");
    let Some(order) = sqlx::query_as::<_, Order>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };
    let items = find_items(pool, order.id).await?;
    Ok(Some(OrderDetail { order, items }))
}

pub async fn pickup_code_exists(pool: &SqlitePool, code: &str) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE pickup_code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Customer's own orders, newest first
pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Staff listing with optional status filter, newest first
pub async fn list(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Order>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "{ORDER_SELECT} WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            );
            sqlx::query_as::<_, Order>(&sql)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("{ORDER_SELECT} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
            sqlx::query_as::<_, Order>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

/// Status change applied with an optimistic guard on the current status
#[derive(Debug, Clone)]
pub struct StatusUpdate<'a> {
    pub order_id: i64,
    pub expected: OrderStatus,
    pub next: OrderStatus,
    pub history: &'a [StatusHistoryEntry],
    pub changed_by: Option<i64>,
    pub now: i64,
}

/// Returns `false` when the order's status no longer matches `expected`.
///
/// The matching lifecycle timestamp (`ready_at` / `completed_at` /
/// `cancelled_at`) is stamped with `now`.
pub async fn update_status_guarded(
    conn: &mut SqliteConnection,
    update: StatusUpdate<'_>,
) -> RepoResult<bool> {
    let stamp = |target: OrderStatus| (update.next == target).then_some(update.now);
    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, status_history = ?2, changed_by = ?3, updated_at = ?4, ready_at = COALESCE(?5, ready_at), completed_at = COALESCE(?6, completed_at), cancelled_at = COALESCE(?7, cancelled_at) WHERE id = ?8 AND status = ?9",
    )
    .bind(update.next)
    .bind(to_json(&update.history)?)
    .bind(update.changed_by)
    .bind(update.now)
    .bind(stamp(OrderStatus::Ready))
    .bind(stamp(OrderStatus::Completed))
    .bind(stamp(OrderStatus::Cancelled))
    .bind(update.order_id)
    .bind(update.expected)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}
