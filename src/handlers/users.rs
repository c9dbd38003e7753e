use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::user::{LoginRequest, RegisterRequest, User, UserResponse};
use crate::services::{load_user, mood_window};
use crate::AppState;

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<UserResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = hash_password(&body.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.username)
    .bind(&password_hash)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Conflict("Username already exists".into()))?;

    Ok(Json(user.into()))
}

/// Verify credentials, stamp `first_login` on the first success (the calendar
/// anchor origin) and always refresh `last_login`.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Validation("Invalid password".into()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            first_login = COALESCE(first_login, NOW()),
            last_login = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(user.into()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = load_user(&state.db, user_id).await?;
    Ok(Json(user.into()))
}

/// Provision placeholder rows for the upcoming 7 days. Used after first
/// login; idempotent on repeat calls.
pub async fn initialize_week(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = load_user(&state.db, user_id).await?;
    let today = Utc::now().date_naive();
    mood_window::ensure_upcoming(&state.db, &user, today).await?;
    Ok(Json(serde_json::json!({ "initialized": true })))
}
