//! Order State Machine
//!
//! Status changes, their stock movements and the history append commit in
//! one transaction. The update is guarded on the status that was read, so
//! of two concurrent transitions on the same order only one applies.

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Order, OrderDetail, OrderStatus, OrderTracking, StatusHistoryEntry, StockMovementType,
};
use sqlx::SqlitePool;

use super::pickup_code::{is_valid_pickup_code, normalize_pickup_code};
use crate::db::repository::order::StatusUpdate;
use crate::db::repository::{RepoError, order as order_repo};
use crate::inventory::{StockGuard, StockLedger, StockMovementInput, apply_in_tx};
use crate::notify::{Contact, Enqueuer, NotificationEvent};
use crate::utils::validation::{MAX_NOTE_LEN, normalize_optional, validate_optional_text};

#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    ledger: StockLedger,
    notifier: Arc<dyn Enqueuer>,
    /// 备货扣减库存时使用的下限策略
    fulfilment_guard: StockGuard,
}

impl OrderService {
    pub fn new(
        pool: SqlitePool,
        ledger: StockLedger,
        notifier: Arc<dyn Enqueuer>,
        fulfilment_guard: StockGuard,
    ) -> Self {
        Self {
            pool,
            ledger,
            notifier,
            fulfilment_guard,
        }
    }

    pub async fn get(&self, order_id: i64) -> AppResult<OrderDetail> {
        order_repo::find_detail(&self.pool, order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", order_id))
    }

    /// Public tracking summary by pickup code
    pub async fn track(&self, pickup_code: &str) -> AppResult<OrderTracking> {
        let detail = self.find_by_pickup_code(pickup_code).await?;
        Ok(OrderTracking::from(&detail))
    }

    /// Staff counter check: full order for a pickup code
    pub async fn verify_pickup_code(&self, pickup_code: &str) -> AppResult<OrderDetail> {
        let detail = self.find_by_pickup_code(pickup_code).await?;
        tracing::info!(order_id = detail.order.id, status = %detail.order.status, "Pickup code verified");
        Ok(detail)
    }

    async fn find_by_pickup_code(&self, pickup_code: &str) -> AppResult<OrderDetail> {
        let code = normalize_pickup_code(pickup_code);
        let not_found =
            || AppError::new(ErrorCode::PickupCodeNotFound).with_detail("pickupCode", code.as_str());
        if !is_valid_pickup_code(&code) {
            return Err(not_found());
        }
        order_repo::find_by_pickup_code(&self.pool, &code)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Order>> {
        Ok(order_repo::list_by_user(&self.pool, user_id).await?)
    }

    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Order>> {
        Ok(order_repo::list(&self.pool, status, limit, offset).await?)
    }

    /// Staff-driven transition along the state machine
    pub async fn update_status(
        &self,
        order_id: i64,
        next: OrderStatus,
        actor: Option<i64>,
        note: Option<String>,
    ) -> AppResult<OrderDetail> {
        validate_optional_text(&note, "note", MAX_NOTE_LEN)?;
        let detail = self.get(order_id).await?;
        let current = detail.order.status;
        if !current.can_transition_to(next) {
            return Err(invalid_transition(order_id, current, next));
        }
        self.transition(detail, next, actor, normalize_optional(note))
            .await
    }

    /// Owner self-cancel, only while PENDING
    pub async fn cancel_by_customer(
        &self,
        order_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> AppResult<OrderDetail> {
        validate_optional_text(&reason, "reason", MAX_NOTE_LEN)?;
        let detail = self.get(order_id).await?;
        if detail.order.user_id != Some(user_id) {
            return Err(AppError::permission_denied("Only the order owner can cancel this order")
                .with_detail("orderId", order_id));
        }
        if detail.order.status != OrderStatus::Pending {
            return Err(AppError::new(ErrorCode::OrderCancelNotAllowed)
                .with_detail("orderId", order_id)
                .with_detail("status", detail.order.status.as_str()));
        }
        self.transition(
            detail,
            OrderStatus::Cancelled,
            Some(user_id),
            normalize_optional(reason),
        )
        .await
    }

    /// Returns the detail as committed; nothing after the commit can fail.
    async fn transition(
        &self,
        mut detail: OrderDetail,
        next: OrderStatus,
        actor: Option<i64>,
        note: Option<String>,
    ) -> AppResult<OrderDetail> {
        let order_id = detail.order.id;
        let current = detail.order.status;
        let now = shared::util::now_millis();

        let mut history = detail.order.status_history.clone();
        history.push(StatusHistoryEntry {
            status: next,
            old_status: Some(current),
            timestamp: now,
            changed_by: actor,
            note,
        });

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        let applied = order_repo::update_status_guarded(
            &mut *tx,
            StatusUpdate {
                order_id,
                expected: current,
                next,
                history: &history,
                changed_by: actor,
                now,
            },
        )
        .await?;
        if !applied {
            tracing::warn!(order_id, from = %current, to = %next, "Concurrent status change detected");
            return Err(AppError::new(ErrorCode::OrderStatusConflict)
                .with_detail("orderId", order_id)
                .with_detail("expected", current.as_str()));
        }

        let mut changes = Vec::new();
        if let Some(direction) = stock_direction(current, next) {
            let guard = if direction < 0 {
                self.fulfilment_guard
            } else {
                StockGuard::Permissive
            };
            for item in &detail.items {
                let input = StockMovementInput {
                    product_id: item.product_id,
                    movement_type: StockMovementType::Order,
                    quantity: direction * item.quantity,
                    reason: Some(format!("Order {} {}", detail.order.pickup_code, next)),
                    created_by: actor,
                    order_id: Some(order_id),
                };
                changes.push(apply_in_tx(&mut *tx, &input, guard).await?);
            }
        }
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            order_id,
            pickup_code = %detail.order.pickup_code,
            from = %current,
            to = %next,
            changed_by = ?actor,
            stock_movements = changes.len(),
            "Order status changed"
        );

        self.ledger.after_commit(&changes).await;

        let order = &mut detail.order;
        order.status = next;
        order.status_history = history;
        order.changed_by = actor;
        order.updated_at = now;
        match next {
            OrderStatus::Ready => order.ready_at = Some(now),
            OrderStatus::Completed => order.completed_at = Some(now),
            OrderStatus::Cancelled => order.cancelled_at = Some(now),
            OrderStatus::Pending | OrderStatus::Preparing => {}
        }

        self.notifier
            .enqueue(NotificationEvent::OrderStatusChanged {
                order_id,
                pickup_code: order.pickup_code.clone(),
                status: next,
                old_status: current,
                contact: Contact {
                    full_name: order.full_name.clone(),
                    phone_number: order.phone_number.clone(),
                    email: order.email.clone(),
                },
            })
            .await;
        Ok(detail)
    }
}

/// Stock direction for a transition: -1 reserve on PREPARING, +1 restore on
/// cancelling an order that holds stock.
fn stock_direction(from: OrderStatus, to: OrderStatus) -> Option<i64> {
    match (from, to) {
        (OrderStatus::Pending, OrderStatus::Preparing) => Some(-1),
        (from, OrderStatus::Cancelled) if from.holds_stock() => Some(1),
        _ => None,
    }
}

fn invalid_transition(order_id: i64, from: OrderStatus, to: OrderStatus) -> AppError {
    AppError::with_message(
        ErrorCode::OrderInvalidTransition,
        format!("Cannot change order status from {from} to {to}"),
    )
    .with_detail("orderId", order_id)
    .with_detail("from", from.as_str())
    .with_detail("to", to.as_str())
}
