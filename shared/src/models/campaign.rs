//! Campaign Model (限时特价 / 分类折扣 / 买X付Y)

use crate::error::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Campaign type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CampaignType {
    FlashSale,
    CategoryDiscount,
    #[serde(rename = "BUY_X_GET_Y")]
    #[cfg_attr(feature = "db", sqlx(rename = "BUY_X_GET_Y"))]
    BuyXGetY,
}

/// Campaign entity
///
/// `config` 原样存储为 JSON，读取时按 `campaign_type` 解析为 [`CampaignConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub config: Value,
    /// Unix millis (inclusive)
    pub start_date: i64,
    /// Unix millis (inclusive)
    pub end_date: i64,
    pub is_active: bool,
    pub created_at: i64,
}

impl Campaign {
    /// Live iff active and `start_date <= now <= end_date`
    pub fn is_live(&self, now: i64) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    pub fn parsed_config(&self) -> AppResult<CampaignConfig> {
        CampaignConfig::parse(self.campaign_type, &self.config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleConfig {
    pub discount_percent: f64,
    pub product_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDiscountConfig {
    pub discount_percent: f64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyXGetYConfig {
    pub buy_quantity: i64,
    pub pay_quantity: i64,
    /// None = applies to every item
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Typed campaign configuration
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignConfig {
    FlashSale(FlashSaleConfig),
    CategoryDiscount(CategoryDiscountConfig),
    BuyXGetY(BuyXGetYConfig),
}

impl CampaignConfig {
    /// Parse and validate the raw JSON config for the given campaign type
    pub fn parse(kind: CampaignType, raw: &Value) -> AppResult<Self> {
        let config = match kind {
            CampaignType::FlashSale => Self::FlashSale(decode(raw)?),
            CampaignType::CategoryDiscount => Self::CategoryDiscount(decode(raw)?),
            CampaignType::BuyXGetY => Self::BuyXGetY(decode(raw)?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn campaign_type(&self) -> CampaignType {
        match self {
            Self::FlashSale(_) => CampaignType::FlashSale,
            Self::CategoryDiscount(_) => CampaignType::CategoryDiscount,
            Self::BuyXGetY(_) => CampaignType::BuyXGetY,
        }
    }

    fn validate(&self) -> AppResult<()> {
        match self {
            Self::FlashSale(c) => {
                check_percent(c.discount_percent)?;
                if c.product_ids.is_empty() {
                    return Err(invalid("productIds must not be empty"));
                }
            }
            Self::CategoryDiscount(c) => check_percent(c.discount_percent)?,
            Self::BuyXGetY(c) => {
                if c.buy_quantity < 1 {
                    return Err(invalid("buyQuantity must be at least 1"));
                }
                if c.pay_quantity < 0 || c.pay_quantity >= c.buy_quantity {
                    return Err(invalid("payQuantity must be between 0 and buyQuantity - 1"));
                }
            }
        }
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned>(raw: &Value) -> AppResult<T> {
    serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))
}

fn check_percent(p: f64) -> AppResult<()> {
    if !p.is_finite() || p <= 0.0 || p > 100.0 {
        return Err(invalid("discountPercent must be in (0, 100]"));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::with_message(ErrorCode::CampaignConfigInvalid, msg)
}

/// Create campaign payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCreate {
    pub name: String,
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    pub config: Value,
    pub start_date: i64,
    pub end_date: i64,
    pub is_active: Option<bool>,
}

/// 订单 / 报价中记录的已应用活动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCampaign {
    pub id: i64,
    pub name: String,
    pub discount: f64,
}
