use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub percent: f64,
}

/// Persisted weekly aggregate, unique per `(user_id, week_number)`.
/// `fingerprint` records the week content the stored values were computed
/// from; an empty string means a legacy row saved before fingerprinting.
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyStats {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_number: i32,
    pub average_score: Option<f64>,
    pub entries_count: i32,
    pub breakdown: Json<Vec<CategoryShare>>,
    pub ai_comment: Option<String>,
    pub activities: Json<Vec<String>>,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyStatsResponse {
    pub week_number: i32,
    pub completed: bool,
    pub average_score: Option<f64>,
    pub entries_count: i32,
    pub breakdown: Vec<CategoryShare>,
    pub ai_comment: Option<String>,
    pub activities: Vec<String>,
}

impl WeeklyStatsResponse {
    /// Transient result for a week that is not yet complete. Only the filled
    /// count is meaningful; averages and breakdowns are withheld rather than
    /// computed on partial data.
    pub fn incomplete(week_number: i32, entries_count: i32) -> Self {
        Self {
            week_number,
            completed: false,
            average_score: None,
            entries_count,
            breakdown: Vec::new(),
            ai_comment: None,
            activities: Vec::new(),
        }
    }
}

impl From<WeeklyStats> for WeeklyStatsResponse {
    fn from(ws: WeeklyStats) -> Self {
        let completed = ws.entries_count == 7 && ws.average_score.is_some();
        Self {
            week_number: ws.week_number,
            completed,
            average_score: ws.average_score,
            entries_count: ws.entries_count,
            breakdown: if completed { ws.breakdown.0 } else { Vec::new() },
            ai_comment: if completed { ws.ai_comment } else { None },
            activities: if completed { ws.activities.0 } else { Vec::new() },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeeklyStatsQuery {
    pub week: Option<i32>,
}
