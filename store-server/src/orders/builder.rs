//! Order Aggregate Builder
//!
//! Prices a cart (product snapshot → campaigns → coupon) and persists a new
//! PENDING order. Stock is only checked here; it is decremented when the
//! order moves to PREPARING.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
use shared::models::{
    AppliedCampaign, CouponValidation, CreateOrderRequest, Order, OrderDetail, OrderItem,
    OrderItemInput, OrderStatus, StatusHistoryEntry,
};
use sqlx::SqlitePool;

use super::pickup_code::unique_pickup_code;
use crate::db::repository::{RepoError, order as order_repo, product as product_repo};
use crate::money::{MAX_PRICE, line_total, to_decimal, to_f64};
use crate::promotions::{CartLine, CouponValidator, apply_active_campaigns};
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_QUANTITY, MAX_SHORT_TEXT_LEN,
    normalize_optional, validate_optional_text, validate_required_text,
};

/// Retries when a concurrent insert took the same pickup code or order id
const MAX_INSERT_ATTEMPTS: usize = 3;

/// 订单头唯一约束冲突 (可重试)
fn is_header_conflict(msg: &str) -> bool {
    msg.contains("orders.pickup_code") || msg.contains("orders.id")
}

/// POST /api/cart/quote body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuoteRequest {
    pub items: Vec<OrderItemInput>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub product_id: i64,
    pub product_name: String,
    pub price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

/// Checkout preview, priced exactly as order creation would
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuote {
    pub items: Vec<QuoteLine>,
    pub subtotal: f64,
    pub campaign_discount: f64,
    pub applied_campaigns: Vec<AppliedCampaign>,
    pub discount_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponValidation>,
    pub total_amount: f64,
}

/// Product snapshot for one merged cart line
#[derive(Debug, Clone)]
struct PricedLine {
    product_id: i64,
    product_name: String,
    price: f64,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct PricedCart {
    lines: Vec<PricedLine>,
    subtotal: f64,
    campaign_discount: f64,
    applied_campaigns: Vec<AppliedCampaign>,
    coupon: Option<CouponValidation>,
    total_amount: f64,
}

impl PricedCart {
    fn discount_amount(&self) -> f64 {
        self.coupon.as_ref().map_or(0.0, |c| c.discount_amount)
    }
}

#[derive(Clone)]
pub struct OrderBuilder {
    pool: SqlitePool,
    coupons: CouponValidator,
}

impl OrderBuilder {
    pub fn new(pool: SqlitePool) -> Self {
        let coupons = CouponValidator::new(pool.clone());
        Self { pool, coupons }
    }

    /// Price a cart without persisting anything
    pub async fn quote(&self, req: CartQuoteRequest) -> AppResult<CartQuote> {
        let cart = self.price_cart(&req.items, req.coupon_code.as_deref()).await?;
        Ok(CartQuote {
            items: cart
                .lines
                .iter()
                .map(|l| QuoteLine {
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    price: l.price,
                    quantity: l.quantity,
                    line_total: to_f64(line_total(l.price, l.quantity)),
                })
                .collect(),
            subtotal: cart.subtotal,
            campaign_discount: cart.campaign_discount,
            applied_campaigns: cart.applied_campaigns.clone(),
            discount_amount: cart.discount_amount(),
            coupon: cart.coupon.clone(),
            total_amount: cart.total_amount,
        })
    }

    /// Create a PENDING order
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
        user_id: Option<i64>,
    ) -> AppResult<OrderDetail> {
        validate_required_text(&req.full_name, "fullName", MAX_NAME_LEN)?;
        validate_required_text(&req.phone_number, "phoneNumber", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&req.email, "email", MAX_EMAIL_LEN)?;
        validate_optional_text(&req.note, "note", MAX_NOTE_LEN)?;

        let cart = self.price_cart(&req.items, req.coupon_code.as_deref()).await?;

        let now = shared::util::now_millis();
        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|l| OrderItem {
                id: 0,
                order_id: 0,
                product_id: l.product_id,
                product_name: l.product_name.clone(),
                quantity: l.quantity,
                price: l.price,
            })
            .collect();

        let mut order = Order {
            id: 0,
            user_id,
            status: OrderStatus::Pending,
            pickup_code: String::new(),
            subtotal: cart.subtotal,
            campaign_discount: cart.campaign_discount,
            discount_amount: cart.discount_amount(),
            total_amount: cart.total_amount,
            coupon_code: cart.coupon.as_ref().map(|c| c.coupon_code.clone()),
            applied_campaigns: cart.applied_campaigns.clone(),
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                old_status: None,
                timestamp: now,
                changed_by: user_id,
                note: None,
            }],
            full_name: req.full_name.trim().to_string(),
            phone_number: req.phone_number.trim().to_string(),
            email: normalize_optional(req.email),
            note: normalize_optional(req.note),
            changed_by: user_id,
            created_at: now,
            updated_at: now,
            ready_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        let items = self.persist(&mut order, &items).await?;

        tracing::info!(
            order_id = order.id,
            pickup_code = %order.pickup_code,
            user_id = ?user_id,
            items = items.len(),
            subtotal = order.subtotal,
            campaign_discount = order.campaign_discount,
            discount_amount = order.discount_amount,
            total = order.total_amount,
            "Order created"
        );

        Ok(OrderDetail { order, items })
    }

    /// Insert header + lines in one transaction, retrying on header races.
    ///
    /// Each attempt draws a fresh order id and pickup code; any other
    /// unique violation is returned as-is.
    async fn persist(&self, order: &mut Order, items: &[OrderItem]) -> AppResult<Vec<OrderItem>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            order.id = shared::util::snowflake_id();
            order.pickup_code = unique_pickup_code(&self.pool).await?;

            let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
            match order_repo::insert(&mut *tx, order, items).await {
                Ok(saved) => {
                    tx.commit().await.map_err(RepoError::from)?;
                    return Ok(saved);
                }
                Err(RepoError::Duplicate(msg))
                    if attempt < MAX_INSERT_ATTEMPTS && is_header_conflict(&msg) =>
                {
                    tracing::warn!(attempt, error = %msg, "Order header taken concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn price_cart(
        &self,
        items: &[OrderItemInput],
        coupon_code: Option<&str>,
    ) -> AppResult<PricedCart> {
        let merged = merge_lines(items)?;

        let mut lines = Vec::with_capacity(merged.len());
        let mut engine_lines = Vec::with_capacity(merged.len());
        for (product_id, quantity) in merged {
            let product = product_repo::find_by_id(&self.pool, product_id)
                .await?
                .filter(|p| !p.is_deleted)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ProductNotFound).with_detail("productId", product_id)
                })?;
            if !product.price.is_finite() || product.price < 0.0 || product.price > MAX_PRICE {
                return Err(AppError::new(ErrorCode::ProductInvalidPrice)
                    .with_detail("productId", product_id));
            }
            if product.stock < quantity {
                return Err(AppError::new(ErrorCode::InsufficientStock)
                    .with_detail("productId", product_id)
                    .with_detail("available", product.stock)
                    .with_detail("requested", quantity));
            }

            engine_lines.push(CartLine {
                product_id,
                category_id: product.category_id,
                price: product.price,
                quantity,
            });
            lines.push(PricedLine {
                product_id,
                product_name: product.name,
                price: product.price,
                quantity,
            });
        }

        let subtotal = to_f64(
            lines
                .iter()
                .map(|l| line_total(l.price, l.quantity))
                .sum::<Decimal>(),
        );

        let now = shared::util::now_millis();
        let campaigns = apply_active_campaigns(&self.pool, &engine_lines, now).await?;
        let after_campaign = (to_decimal(subtotal) - to_decimal(campaigns.total_discount)).max(Decimal::ZERO);

        let coupon = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => self.try_coupon(code, to_f64(after_campaign)).await?,
            None => None,
        };
        let coupon_discount = coupon.as_ref().map_or(Decimal::ZERO, |c| to_decimal(c.discount_amount));
        let total = (after_campaign - coupon_discount).max(Decimal::ZERO);

        Ok(PricedCart {
            lines,
            subtotal,
            campaign_discount: campaigns.total_discount,
            applied_campaigns: campaigns.applied_campaigns,
            coupon,
            total_amount: to_f64(total),
        })
    }

    /// Invalid or unknown coupons are dropped; system failures propagate
    async fn try_coupon(&self, code: &str, amount: f64) -> AppResult<Option<CouponValidation>> {
        match self.coupons.validate(code, amount).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code.category() == ErrorCategory::System => Err(e),
            Err(e) => {
                tracing::info!(code = %code, reason = %e, "Ignoring coupon");
                Ok(None)
            }
        }
    }
}

/// Validate quantities and merge duplicate product lines, keeping first-seen order
fn merge_lines(items: &[OrderItemInput]) -> AppResult<Vec<(i64, i64)>> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "quantity must be greater than 0",
            )
            .with_detail("productId", item.id));
        }
        let too_many = |qty: i64| {
            AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("quantity exceeds maximum allowed ({MAX_QUANTITY}), got {qty}"),
            )
            .with_detail("productId", item.id)
        };
        if item.quantity > MAX_QUANTITY {
            return Err(too_many(item.quantity));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.id) {
            Some(entry) => {
                // 单行已限幅, 相加不会溢出
                let qty = entry.1 + item.quantity;
                if qty > MAX_QUANTITY {
                    return Err(too_many(qty));
                }
                entry.1 = qty;
            }
            None => merged.push((item.id, item.quantity)),
        }
    }
    Ok(merged)
}
