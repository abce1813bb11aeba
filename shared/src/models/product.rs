//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock` 只能由库存流水修改，允许为负（手工调整可透支）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    /// 低库存提醒阈值
    pub low_stock_threshold: i64,
    pub category_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    pub category_id: Option<i64>,
}
