use axum::{extract::State, Json};
use chrono::Utc;

use crate::error::AppResult;
use crate::services::recommendation::{
    self, DailyRecommendationRequest, Recommendation, WeekRecommendationRequest,
};
use crate::AppState;

/// POST /api/recommendations/daily
pub async fn daily(
    State(state): State<AppState>,
    Json(body): Json<DailyRecommendationRequest>,
) -> AppResult<Json<Recommendation>> {
    let today = Utc::now().date_naive();
    let rec = recommendation::recommend_daily(&state, &body, today).await?;
    Ok(Json(rec))
}

/// POST /api/recommendations/week
pub async fn week(
    State(state): State<AppState>,
    Json(body): Json<WeekRecommendationRequest>,
) -> AppResult<Json<Recommendation>> {
    let today = Utc::now().date_naive();
    let rec = recommendation::recommend_for_week(&state, &body, today).await?;
    Ok(Json(rec))
}
