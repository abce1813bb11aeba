//! Stock Movement & Back-in-stock Models

use serde::{Deserialize, Serialize};

/// Stock movement type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StockMovementType {
    /// 入库
    In,
    /// 出库
    Out,
    /// 盘点调整
    Adjustment,
    /// 订单出入库（备货扣减 / 取消回补）
    Order,
}

impl StockMovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Adjustment => "ADJUSTMENT",
            Self::Order => "ORDER",
        }
    }
}

/// Stock movement entity (append-only ledger row)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub movement_type: StockMovementType,
    /// Signed delta
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: Option<String>,
    pub created_by: Option<i64>,
    pub order_id: Option<i64>,
    pub created_at: i64,
}

/// Manual stock movement payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementCreate {
    #[serde(rename = "type")]
    pub movement_type: StockMovementType,
    pub quantity: i64,
    pub reason: Option<String>,
}

/// 到货提醒订阅
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct BackInStockSubscription {
    pub id: i64,
    pub product_id: i64,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub created_at: i64,
}

/// Subscribe payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackInStockSubscribe {
    pub phone_number: Option<String>,
    pub email: Option<String>,
}
