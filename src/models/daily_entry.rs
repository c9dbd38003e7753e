use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One row per user per calendar date. `mood` is null while the row is a
/// placeholder; `created_at` is set only when the mood is filled.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub mood: Option<i32>,
    pub week_number: i32,
    pub day_name: String,
    pub reason: Option<String>,
    pub ai_comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitMoodRequest {
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood: i32,
    #[validate(length(max = 500, message = "Reason too long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPastMoodRequest {
    pub date: NaiveDate,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood: i32,
    #[validate(length(max = 500, message = "Reason too long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyEntryResponse {
    pub date: NaiveDate,
    pub day_name: String,
    pub week_number: i32,
    pub mood: Option<i32>,
    pub reason: Option<String>,
    pub ai_comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<DailyEntry> for DailyEntryResponse {
    fn from(e: DailyEntry) -> Self {
        Self {
            date: e.entry_date,
            day_name: e.day_name,
            week_number: e.week_number,
            mood: e.mood,
            reason: e.reason,
            ai_comment: e.ai_comment,
            created_at: e.created_at,
        }
    }
}
