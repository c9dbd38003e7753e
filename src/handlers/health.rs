use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "moodify-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the database must answer and migrations must have run. The AI
/// client is reported but never gates readiness, the service degrades to
/// static recommendations without it.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let migrations_applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success",
    )
    .fetch_one(&state.db)
    .await
    .unwrap_or(0);

    let ai_mode = if state.ai.enabled() { "enabled" } else { "fallback" };

    if db_ok && migrations_applied > 0 {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": {
                    "database": "ok",
                    "migrations_applied": migrations_applied,
                    "ai": ai_mode,
                },
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": {
                    "database": if db_ok { "ok" } else { "failed" },
                    "migrations_applied": migrations_applied,
                    "ai": ai_mode,
                },
            })),
        )
    }
}
