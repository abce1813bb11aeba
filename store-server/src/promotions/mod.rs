//! Promotions: campaigns and coupons
//!
//! - [`campaign_engine`] - 纯计算：活动折扣
//! - [`coupon`] - 优惠券校验

pub mod campaign_engine;
pub mod coupon;

pub use campaign_engine::{CampaignDiscountResult, CampaignRule, CartLine, calculate_campaign_discount};
pub use coupon::{CouponValidator, evaluate_coupon};

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Campaign, CampaignConfig, CampaignCreate, Coupon, CouponCreate, DiscountType,
    normalize_coupon_code,
};
use sqlx::SqlitePool;

use crate::db::repository::{RepoError, campaign as campaign_repo, coupon as coupon_repo};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_amount, validate_optional_text,
    validate_required_text,
};

/// Load live campaigns and compute the cart's campaign discount.
///
/// Campaigns with an unparseable config are skipped with a warning.
pub async fn apply_active_campaigns(
    pool: &SqlitePool,
    lines: &[CartLine],
    now: i64,
) -> AppResult<CampaignDiscountResult> {
    if lines.is_empty() {
        return Ok(CampaignDiscountResult::default());
    }
    let campaigns = campaign_repo::find_live(pool, now).await?;
    let rules = to_rules(&campaigns);
    Ok(calculate_campaign_discount(lines, &rules, now))
}

fn to_rules(campaigns: &[Campaign]) -> Vec<CampaignRule> {
    campaigns
        .iter()
        .filter_map(|c| match CampaignRule::try_from(c) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!(campaign_id = c.id, error = %e, "Skipping campaign with invalid config");
                None
            }
        })
        .collect()
}

/// Live campaigns for the storefront
pub async fn list_live_campaigns(pool: &SqlitePool, now: i64) -> AppResult<Vec<Campaign>> {
    let campaigns = campaign_repo::find_live(pool, now).await?;
    Ok(campaigns
        .into_iter()
        .filter(|c| c.parsed_config().is_ok())
        .collect())
}

pub async fn create_campaign(pool: &SqlitePool, data: CampaignCreate) -> AppResult<Campaign> {
    validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    if data.end_date < data.start_date {
        return Err(AppError::with_message(
            ErrorCode::CampaignConfigInvalid,
            "endDate must not be before startDate",
        ));
    }
    CampaignConfig::parse(data.campaign_type, &data.config)?;

    let campaign = campaign_repo::create(pool, data).await?;
    tracing::info!(campaign_id = campaign.id, kind = ?campaign.campaign_type, "Campaign created");
    Ok(campaign)
}

pub async fn create_coupon(pool: &SqlitePool, mut data: CouponCreate) -> AppResult<Coupon> {
    data.code = normalize_coupon_code(&data.code);
    validate_required_text(&data.code, "code", MAX_SHORT_TEXT_LEN)?;
    validate_amount(data.discount_value, "discountValue")?;
    if let Some(min) = data.min_order_amount {
        validate_amount(min, "minOrderAmount")?;
    }
    if data.discount_type == DiscountType::Percentage && data.discount_value > 100.0 {
        return Err(AppError::validation("percentage discount must not exceed 100")
            .with_detail("field", "discountValue"));
    }

    let code = data.code.clone();
    let coupon = coupon_repo::create(pool, data).await.map_err(|e| match e {
        RepoError::Duplicate(_) => {
            AppError::new(ErrorCode::CouponCodeExists).with_detail("code", code.as_str())
        }
        other => other.into(),
    })?;
    tracing::info!(coupon_id = coupon.id, code = %coupon.code, "Coupon created");
    Ok(coupon)
}
