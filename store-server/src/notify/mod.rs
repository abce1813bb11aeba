//! 通知边界
//!
//! 业务代码只产生 [`NotificationEvent`]，经由 [`Enqueuer`] 投递到
//! [`NotificationSink`]。投递失败只记录日志，不影响业务结果。
//!
//! - [`sink`] - 通知出口 (日志 / Webhook / 内存)
//! - [`enqueuer`] - 投递策略 (同步 / 队列)
//! - [`worker`] - 队列消费者

pub mod enqueuer;
pub mod sink;
pub mod worker;

pub use enqueuer::{DirectExecutor, Enqueuer, QueueBackedExecutor};
pub use sink::{LogSink, MemorySink, NotificationSink, WebhookSink};
pub use worker::NotificationWorker;

use serde::{Deserialize, Serialize};
use shared::models::OrderStatus;
use thiserror::Error;

/// Customer contact attached to order notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub full_name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// 通知事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged {
        order_id: i64,
        pickup_code: String,
        status: OrderStatus,
        old_status: OrderStatus,
        contact: Contact,
    },
    #[serde(rename_all = "camelCase")]
    LowStock {
        product_id: i64,
        product_name: String,
        stock: i64,
        threshold: i64,
    },
    #[serde(rename_all = "camelCase")]
    BackInStock {
        product_id: i64,
        product_name: String,
        phone_number: Option<String>,
        email: Option<String>,
    },
}

impl NotificationEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::LowStock { .. } => "low_stock",
            Self::BackInStock { .. } => "back_in_stock",
        }
    }
}

/// 通知投递错误
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("通知网关请求失败: {0}")]
    Transport(String),

    #[error("通知网关返回错误状态: {0}")]
    Rejected(u16),

    #[error("通知序列化失败: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = NotificationEvent::LowStock {
            product_id: 7,
            product_name: "Pencil HB".into(),
            stock: 2,
            threshold: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LOW_STOCK");
        assert_eq!(json["productName"], "Pencil HB");
        assert_eq!(event.kind(), "low_stock");

        let event = NotificationEvent::OrderStatusChanged {
            order_id: 1,
            pickup_code: "A1B2C3".into(),
            status: OrderStatus::Ready,
            old_status: OrderStatus::Preparing,
            contact: Contact {
                full_name: "Ana".into(),
                phone_number: "600000000".into(),
                email: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ORDER_STATUS_CHANGED");
        assert_eq!(json["status"], "READY");
        assert_eq!(json["oldStatus"], "PREPARING");
        assert!(json["contact"].get("email").is_none());
    }
}
