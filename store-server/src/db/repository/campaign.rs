//! Campaign Repository

use super::{RepoError, RepoResult};
use shared::models::{Campaign, CampaignCreate};
use sqlx::SqlitePool;

const CAMPAIGN_SELECT: &str = "SELECT id, name, description, campaign_type, config, start_date, end_date, is_active, created_at FROM campaign";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Campaign>> {
    let sql = format!("{CAMPAIGN_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Campaign>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Active campaigns whose window contains `now` (bounds inclusive)
pub async fn find_live(pool: &SqlitePool, now: i64) -> RepoResult<Vec<Campaign>> {
    let sql = format!(
        "{CAMPAIGN_SELECT} WHERE is_active = 1 AND start_date <= ?1 AND end_date >= ?1 ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, Campaign>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: CampaignCreate) -> RepoResult<Campaign> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let config = serde_json::to_string(&data.config)
        .map_err(|e| RepoError::Validation(format!("Invalid campaign config: {e}")))?;
    sqlx::query(
        "INSERT INTO campaign (id, name, description, campaign_type, config, start_date, end_date, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.campaign_type)
    .bind(config)
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create campaign".into()))
}
