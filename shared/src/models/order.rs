//! Order Model
//!
//! 状态机：
//!
//! ```text
//! PENDING ──► PREPARING ──► READY ──► COMPLETED
//!    │            │           │
//!    └────────────┴───────────┴──► CANCELLED
//! ```

use super::campaign::AppliedCampaign;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// 合法的下一状态
    pub const fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Same-status requests are not a transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// 备货后才占用库存：只有这些状态取消时需要回补
    pub fn holds_stock(&self) -> bool {
        matches!(self, Self::Preparing | Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态历史条目 (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<OrderStatus>,
    /// Unix millis
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Order entity
///
/// `subtotal - campaign_discount - discount_amount == total_amount`，创建后金额不再变化
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub status: OrderStatus,
    /// 6 uppercase hex chars
    pub pickup_code: String,
    pub subtotal: f64,
    pub campaign_discount: f64,
    /// Coupon discount
    pub discount_amount: f64,
    pub total_amount: f64,
    pub coupon_code: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub applied_campaigns: Vec<AppliedCampaign>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub status_history: Vec<StatusHistoryEntry>,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub note: Option<String>,
    pub changed_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub ready_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
}

/// Order line (price snapshot at creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Order with its items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// 取货码公开查询结果（不含联系方式）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub pickup_code: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub item_count: i64,
    pub created_at: i64,
    pub ready_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub status_history: Vec<StatusHistoryEntry>,
}

impl From<&OrderDetail> for OrderTracking {
    fn from(detail: &OrderDetail) -> Self {
        let o = &detail.order;
        Self {
            pickup_code: o.pickup_code.clone(),
            status: o.status,
            total_amount: o.total_amount,
            item_count: detail.items.iter().map(|i| i.quantity).sum(),
            created_at: o.created_at,
            ready_at: o.ready_at,
            completed_at: o.completed_at,
            cancelled_at: o.cancelled_at,
            status_history: o.status_history.clone(),
        }
    }
}

/// Cart line input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    /// Product id
    pub id: i64,
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub note: Option<String>,
    pub coupon_code: Option<String>,
}

/// Staff status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}
