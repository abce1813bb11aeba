//! Stock Ledger
//!
//! `product.stock` is only ever changed here, and every change appends a
//! movement row with the before/after snapshot. Notifications (low stock,
//! back in stock) run after commit and never fail the caller.

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    BackInStockSubscribe, BackInStockSubscription, StockMovement, StockMovementCreate,
    StockMovementType,
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::repository::stock_movement::NewMovement;
use crate::db::repository::{back_in_stock, product as product_repo, stock_movement};
use crate::notify::{Enqueuer, NotificationEvent};
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, normalize_optional, validate_optional_text,
};

/// 库存下限策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockGuard {
    /// 允许负库存
    #[default]
    Permissive,
    /// 变更后库存不得小于 0
    NonNegative,
}

#[derive(Debug, Clone)]
pub struct StockMovementInput {
    pub product_id: i64,
    pub movement_type: StockMovementType,
    /// Signed delta; never zero
    pub quantity: i64,
    pub reason: Option<String>,
    pub created_by: Option<i64>,
    pub order_id: Option<i64>,
}

impl StockMovementInput {
    /// Build a staff-entered movement.
    ///
    /// IN adds and OUT removes `|quantity|`; ADJUSTMENT keeps the sign as
    /// given. ORDER movements are reserved for the order state machine.
    pub fn manual(product_id: i64, data: StockMovementCreate, created_by: i64) -> AppResult<Self> {
        let quantity = match data.movement_type {
            StockMovementType::In => data.quantity.abs(),
            StockMovementType::Out => -data.quantity.abs(),
            StockMovementType::Adjustment => data.quantity,
            StockMovementType::Order => {
                return Err(AppError::with_message(
                    ErrorCode::StockMovementInvalid,
                    "ORDER movements are created by order status changes",
                ));
            }
        };
        if quantity == 0 {
            return Err(AppError::with_message(
                ErrorCode::StockMovementInvalid,
                "quantity must not be zero",
            ));
        }
        validate_optional_text(&data.reason, "reason", MAX_NOTE_LEN)?;
        Ok(Self {
            product_id,
            movement_type: data.movement_type,
            quantity,
            reason: normalize_optional(data.reason),
            created_by: Some(created_by),
            order_id: None,
        })
    }
}

/// Result of one applied movement
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: i64,
    pub product_name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub movement: StockMovement,
}

/// Apply one movement inside a caller-owned transaction.
///
/// `previous_stock` is derived from the value returned by the atomic
/// update, so concurrent movements never observe the same snapshot.
pub async fn apply_in_tx(
    conn: &mut SqliteConnection,
    input: &StockMovementInput,
    guard: StockGuard,
) -> AppResult<StockChange> {
    if input.quantity == 0 {
        return Err(AppError::with_message(
            ErrorCode::StockMovementInvalid,
            "quantity must not be zero",
        ));
    }

    let non_negative = guard == StockGuard::NonNegative;
    let Some(row) = product_repo::adjust_stock(conn, input.product_id, input.quantity, non_negative).await?
    else {
        if !product_repo::exists(conn, input.product_id).await? {
            return Err(AppError::new(ErrorCode::ProductNotFound)
                .with_detail("productId", input.product_id));
        }
        return Err(AppError::new(ErrorCode::InsufficientStock)
            .with_detail("productId", input.product_id)
            .with_detail("requested", -input.quantity));
    };

    let previous_stock = row.stock - input.quantity;
    let movement = stock_movement::insert(
        conn,
        NewMovement {
            product_id: input.product_id,
            movement_type: input.movement_type,
            quantity: input.quantity,
            previous_stock,
            new_stock: row.stock,
            reason: input.reason.as_deref(),
            created_by: input.created_by,
            order_id: input.order_id,
        },
    )
    .await?;

    Ok(StockChange {
        product_id: input.product_id,
        product_name: row.name,
        previous_stock,
        new_stock: row.stock,
        quantity: input.quantity,
        low_stock_threshold: row.low_stock_threshold,
        movement,
    })
}

/// 库存台账服务
#[derive(Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    notifier: Arc<dyn Enqueuer>,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Enqueuer>) -> Self {
        Self { pool, notifier }
    }

    /// Record a standalone (manual) movement in its own transaction
    pub async fn record_movement(&self, input: StockMovementInput) -> AppResult<StockChange> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let change = apply_in_tx(&mut *tx, &input, StockGuard::Permissive).await?;
        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            product_id = change.product_id,
            movement_type = change.movement.movement_type.as_str(),
            quantity = change.quantity,
            previous_stock = change.previous_stock,
            new_stock = change.new_stock,
            "Stock movement recorded"
        );

        self.after_commit(std::slice::from_ref(&change)).await;
        Ok(change)
    }

    /// Post-commit side effects for a batch of applied movements
    pub async fn after_commit(&self, changes: &[StockChange]) {
        for change in changes {
            if change.new_stock > 0 && change.new_stock <= change.low_stock_threshold {
                tracing::warn!(
                    product_id = change.product_id,
                    product = %change.product_name,
                    stock = change.new_stock,
                    threshold = change.low_stock_threshold,
                    "Low stock"
                );
                self.notifier
                    .enqueue(NotificationEvent::LowStock {
                        product_id: change.product_id,
                        product_name: change.product_name.clone(),
                        stock: change.new_stock,
                        threshold: change.low_stock_threshold,
                    })
                    .await;
            }

            if change.previous_stock == 0 && change.quantity > 0 {
                self.notify_back_in_stock(change).await;
            }
        }
    }

    async fn notify_back_in_stock(&self, change: &StockChange) {
        let subscriptions = match back_in_stock::take_for_product(&self.pool, change.product_id).await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!(product_id = change.product_id, error = %e, "Failed to load back-in-stock subscriptions");
                return;
            }
        };
        if subscriptions.is_empty() {
            return;
        }
        tracing::info!(
            product_id = change.product_id,
            count = subscriptions.len(),
            "Product back in stock, notifying subscribers"
        );
        for sub in subscriptions {
            self.notifier
                .enqueue(NotificationEvent::BackInStock {
                    product_id: change.product_id,
                    product_name: change.product_name.clone(),
                    phone_number: sub.phone_number,
                    email: sub.email,
                })
                .await;
        }
    }

    /// 到货提醒订阅，至少需要手机号或邮箱之一
    pub async fn subscribe_back_in_stock(
        &self,
        product_id: i64,
        data: BackInStockSubscribe,
    ) -> AppResult<BackInStockSubscription> {
        validate_optional_text(&data.phone_number, "phoneNumber", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&data.email, "email", MAX_EMAIL_LEN)?;
        let phone = normalize_optional(data.phone_number);
        let email = normalize_optional(data.email);
        if phone.is_none() && email.is_none() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "phoneNumber or email is required",
            ));
        }

        let product = product_repo::find_by_id(&self.pool, product_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("productId", product_id))?;

        let sub = back_in_stock::create(&self.pool, product_id, phone.as_deref(), email.as_deref()).await?;
        tracing::info!(product_id, product = %product.name, "Back-in-stock subscription created");
        Ok(sub)
    }

    pub async fn list_movements(
        &self,
        product_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<StockMovement>> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        if !product_repo::exists(&mut *conn, product_id).await? {
            return Err(AppError::new(ErrorCode::ProductNotFound).with_detail("productId", product_id));
        }
        drop(conn);
        Ok(stock_movement::list_by_product(&self.pool, product_id, limit, offset).await?)
    }
}

fn db_err(e: sqlx::Error) -> AppError {
    crate::db::repository::RepoError::from(e).into()
}
