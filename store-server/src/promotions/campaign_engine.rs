//! Campaign Discount Calculator
//!
//! Pure calculation over cart lines and already-loaded campaign rules.
//! Per line at most one percentage campaign applies (flash sale before
//! category discount), plus at most one buy-X-get-Y campaign.

use rust_decimal::prelude::*;
use shared::models::{AppliedCampaign, Campaign, CampaignConfig};

use crate::money::{clamp_discount, line_total, percent_of, to_decimal, to_f64};

/// A priced cart line as seen by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: i64,
    pub category_id: Option<i64>,
    pub price: f64,
    pub quantity: i64,
}

/// Campaign with its config already parsed
#[derive(Debug, Clone)]
pub struct CampaignRule {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub start_date: i64,
    pub end_date: i64,
    pub config: CampaignConfig,
}

impl CampaignRule {
    pub fn is_live(&self, now: i64) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }
}

impl TryFrom<&Campaign> for CampaignRule {
    type Error = shared::error::AppError;

    fn try_from(c: &Campaign) -> Result<Self, Self::Error> {
        Ok(Self {
            id: c.id,
            name: c.name.clone(),
            is_active: c.is_active,
            start_date: c.start_date,
            end_date: c.end_date,
            config: c.parsed_config()?,
        })
    }
}

/// Result of campaign discount calculation for a whole cart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignDiscountResult {
    /// Total discount (rounded to 2 decimal places)
    pub total_discount: f64,
    /// Campaigns that contributed, deduplicated by id, in first-use order
    pub applied_campaigns: Vec<AppliedCampaign>,
}

/// Calculate campaign discounts for a cart.
///
/// Rules that are not live at `now` are ignored even if the caller passed
/// them in.
pub fn calculate_campaign_discount(
    lines: &[CartLine],
    rules: &[CampaignRule],
    now: i64,
) -> CampaignDiscountResult {
    let live: Vec<&CampaignRule> = rules.iter().filter(|r| r.is_live(now)).collect();
    if lines.is_empty() || live.is_empty() {
        return CampaignDiscountResult::default();
    }

    // (campaign id, name, accumulated discount), first-use order
    let mut per_campaign: Vec<(i64, String, Decimal)> = Vec::new();
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            continue;
        }
        let gross = line_total(line.price, line.quantity);
        let mut contributions: Vec<(&CampaignRule, Decimal)> = Vec::with_capacity(2);

        if let Some((rule, percent)) = find_percentage_rule(&live, line) {
            contributions.push((rule, percent_of(gross, percent)));
        }
        if let Some((rule, discount)) = find_buy_x_get_y(&live, line) {
            contributions.push((rule, discount));
        }

        // 单行折扣不超过行总额
        let mut remaining = gross;
        for (rule, amount) in contributions {
            let applied = clamp_discount(amount, remaining);
            if applied.is_zero() {
                continue;
            }
            remaining -= applied;
            total += applied;
            match per_campaign.iter_mut().find(|(id, _, _)| *id == rule.id) {
                Some(entry) => entry.2 += applied,
                None => per_campaign.push((rule.id, rule.name.clone(), applied)),
            }
        }
    }

    CampaignDiscountResult {
        total_discount: to_f64(total),
        applied_campaigns: per_campaign
            .into_iter()
            .map(|(id, name, discount)| AppliedCampaign {
                id,
                name,
                discount: to_f64(discount),
            })
            .collect(),
    }
}

/// First flash sale listing the product, else first category discount
/// matching the line's category.
fn find_percentage_rule<'a>(
    live: &[&'a CampaignRule],
    line: &CartLine,
) -> Option<(&'a CampaignRule, f64)> {
    let flash = live.iter().find_map(|r| match &r.config {
        CampaignConfig::FlashSale(c) if c.product_ids.contains(&line.product_id) => {
            Some((*r, c.discount_percent))
        }
        _ => None,
    });
    if flash.is_some() {
        return flash;
    }
    let category_id = line.category_id?;
    live.iter().find_map(|r| match &r.config {
        CampaignConfig::CategoryDiscount(c) if c.category_id == category_id => {
            Some((*r, c.discount_percent))
        }
        _ => None,
    })
}

/// First buy-X-get-Y whose category matches (or which has no category).
/// Discount = floor(qty / buy) * (buy - pay) * price
fn find_buy_x_get_y<'a>(
    live: &[&'a CampaignRule],
    line: &CartLine,
) -> Option<(&'a CampaignRule, Decimal)> {
    live.iter().find_map(|r| match &r.config {
        CampaignConfig::BuyXGetY(c)
            if c.buy_quantity > 0
                && c.category_id.is_none_or(|cat| line.category_id == Some(cat)) =>
        {
            let groups = line.quantity / c.buy_quantity;
            let free_units = groups * (c.buy_quantity - c.pay_quantity);
            Some((*r, to_decimal(line.price) * Decimal::from(free_units)))
        }
        _ => None,
    })
}
