//! Campaign API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::models::{Campaign, CampaignCreate};

use crate::core::ServerState;
use crate::promotions;
use crate::utils::AppResult;

/// GET /api/campaigns/public - 当前生效的活动
pub async fn list_public(State(state): State<ServerState>) -> AppResult<Json<Vec<Campaign>>> {
    let now = shared::util::now_millis();
    Ok(Json(promotions::list_live_campaigns(&state.pool, now).await?))
}

/// POST /api/campaigns
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CampaignCreate>,
) -> AppResult<(StatusCode, Json<Campaign>)> {
    let campaign = promotions::create_campaign(&state.pool, payload).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}
