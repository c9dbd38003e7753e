use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::User;

pub mod mood_window;
pub mod profile;
pub mod recommendation;
pub mod weekly_stats;

pub async fn load_user(db: &PgPool, id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))
}
