use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::user::{User, UserInfoResponse, UserInfoUpdateRequest};
use crate::services::load_user;
use crate::AppState;

/// GET /api/users/:id/info
pub async fn get_info(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserInfoResponse>> {
    let user = load_user(&state.db, user_id).await?;
    Ok(Json(UserInfoResponse {
        birth_date: user.birth_date,
        gender: user.gender.clone(),
        hobbies: user.hobby_list(),
    }))
}

/// PUT /api/users/:id/info — partial update; absent fields keep their value.
pub async fn update_info(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserInfoUpdateRequest>,
) -> AppResult<Json<UserInfoResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let _existing = load_user(&state.db, user_id).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            birth_date = COALESCE($2, birth_date),
            gender = COALESCE($3, gender),
            hobbies = COALESCE($4, hobbies)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(body.birth_date)
    .bind(&body.gender)
    .bind(body.hobbies.map(SqlJson))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(UserInfoResponse {
        birth_date: user.birth_date,
        gender: user.gender.clone(),
        hobbies: user.hobby_list(),
    }))
}
