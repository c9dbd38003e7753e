use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::daily_entry::{DailyEntryResponse, SubmitMoodRequest, SubmitPastMoodRequest};
use crate::services::{load_user, mood_window};
use crate::AppState;

/// GET /api/users/:id/week — entries for `[today, today+6]`, placeholders
/// ensured first.
pub async fn get_upcoming_week(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<DailyEntryResponse>>> {
    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let entries = mood_window::get_upcoming_week(&state.db, &user, today).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// GET /api/users/:id/weeks/current
pub async fn get_current_week(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<DailyEntryResponse>>> {
    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let entries = mood_window::get_current_week(&state.db, &user, today).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// GET /api/users/:id/weeks/:week — no placeholders are created for future
/// dates, so a fully future week returns an empty list.
pub async fn get_week(
    State(state): State<AppState>,
    Path((user_id, week_number)): Path<(Uuid, i32)>,
) -> AppResult<Json<Vec<DailyEntryResponse>>> {
    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let entries = mood_window::get_week(&state.db, &user, week_number, today).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// POST /api/users/:id/mood — submit today's mood once; 409 when already
/// filled.
pub async fn submit_mood_today(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SubmitMoodRequest>,
) -> AppResult<Json<DailyEntryResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let entry = mood_window::submit_today(
        &state.db,
        &state.ai,
        &user,
        body.mood,
        body.reason.as_deref(),
        today,
    )
    .await?;
    Ok(Json(entry.into()))
}

/// POST /api/users/:id/mood/past — backfill a missed day between the anchor
/// and yesterday.
pub async fn submit_mood_past(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SubmitPastMoodRequest>,
) -> AppResult<Json<DailyEntryResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    let entry = mood_window::submit_past(
        &state.db,
        &state.ai,
        &user,
        body.date,
        body.mood,
        body.reason.as_deref(),
        today,
    )
    .await?;
    Ok(Json(entry.into()))
}
