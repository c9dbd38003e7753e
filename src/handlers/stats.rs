use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::weekly_stats::{WeeklyStatsQuery, WeeklyStatsResponse};
use crate::services::{load_user, weekly_stats};
use crate::AppState;

/// GET /api/users/:id/stats/weekly?week=N — fingerprint-cached weekly stats;
/// the week defaults to the current relative week.
pub async fn get_weekly_stats(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<WeeklyStatsQuery>,
) -> AppResult<Json<WeeklyStatsResponse>> {
    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let stats = weekly_stats::get_or_create(&state, &user, query.week, today).await?;
    Ok(Json(stats))
}
