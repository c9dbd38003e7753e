//! Sliding-window maintenance for daily mood entries.
//!
//! Guarantees exactly one row per `(user, date)`: placeholder rows are created
//! idempotently with `ON CONFLICT DO NOTHING`, and filling a mood is a single
//! atomic upsert guarded by `WHERE mood IS NULL` so concurrent submissions for
//! the same date cannot both win.

use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::OpenAiClient;
use crate::calendar;
use crate::error::{AppError, AppResult};
use crate::models::daily_entry::DailyEntry;
use crate::models::user::User;

/// Dates in `[start, end]` eligible for placeholder creation. The rolling
/// window looks forward from today, so future dates are allowed; a fixed-week
/// lookup must never fabricate rows for dates after today.
pub fn placeholder_dates(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    allow_future: bool,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = start;
    while date <= end {
        if allow_future || date <= today {
            dates.push(date);
        }
        date += Duration::days(1);
    }
    dates
}

async fn ensure_window(
    db: &PgPool,
    user: &User,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    allow_future: bool,
) -> AppResult<()> {
    let anchor = user.anchor(today);
    for date in placeholder_dates(start, end, today, allow_future) {
        sqlx::query(
            r#"
            INSERT INTO daily_entries (id, user_id, entry_date, week_number, day_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, entry_date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(date)
        .bind(calendar::week_number_of(anchor, date))
        .bind(calendar::day_name(date))
        .execute(db)
        .await?;
    }
    Ok(())
}

/// Rolling variant: placeholders for `[today, today+6]`.
pub async fn ensure_upcoming(db: &PgPool, user: &User, today: NaiveDate) -> AppResult<()> {
    ensure_window(db, user, today, today + Duration::days(6), today, true).await
}

/// Fixed-week variant: placeholders for the week's non-future dates only.
pub async fn ensure_week(
    db: &PgPool,
    user: &User,
    week_number: i32,
    today: NaiveDate,
) -> AppResult<()> {
    let (start, end) = calendar::range_of_week(user.anchor(today), week_number);
    ensure_window(db, user, start, end, today, false).await
}

pub async fn entries_in_range(
    db: &PgPool,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<DailyEntry>> {
    let entries = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND entry_date BETWEEN $2 AND $3
        ORDER BY entry_date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;

    Ok(entries)
}

/// Entries for `[today, today+6]`, placeholders ensured first.
pub async fn get_upcoming_week(
    db: &PgPool,
    user: &User,
    today: NaiveDate,
) -> AppResult<Vec<DailyEntry>> {
    ensure_upcoming(db, user, today).await?;
    entries_in_range(db, user.id, today, today + Duration::days(6)).await
}

/// Entries for an arbitrary week. No rows are created for future dates.
pub async fn get_week(
    db: &PgPool,
    user: &User,
    week_number: i32,
    today: NaiveDate,
) -> AppResult<Vec<DailyEntry>> {
    ensure_week(db, user, week_number, today).await?;
    let (start, end) = calendar::range_of_week(user.anchor(today), week_number);
    entries_in_range(db, user.id, start, end).await
}

pub async fn get_current_week(
    db: &PgPool,
    user: &User,
    today: NaiveDate,
) -> AppResult<Vec<DailyEntry>> {
    let week = calendar::week_number_of(user.anchor(today), today);
    get_week(db, user, week, today).await
}

/// Average of the filled moods in a week, 0.0 when none are filled.
pub async fn average_mood_for_week(
    db: &PgPool,
    user: &User,
    week_number: i32,
    today: NaiveDate,
) -> AppResult<f64> {
    let (start, end) = calendar::range_of_week(user.anchor(today), week_number);
    let entries = entries_in_range(db, user.id, start, end).await?;
    let moods: Vec<i32> = entries.iter().filter_map(|e| e.mood).collect();
    if moods.is_empty() {
        return Ok(0.0);
    }
    Ok(moods.iter().sum::<i32>() as f64 / moods.len() as f64)
}

/// Map the fill upsert's result: the update only applies while the stored
/// mood is null, so no returned row means the date was already filled.
fn filled_or_conflict(row: Option<DailyEntry>) -> AppResult<DailyEntry> {
    row.ok_or_else(|| AppError::Conflict("Mood already submitted for this date".into()))
}

/// Transition a placeholder to filled, or create the row directly filled.
/// Exactly one submission per date succeeds: the upsert only applies while
/// the stored mood is null, so a second submission gets no row back.
async fn fill_mood(
    db: &PgPool,
    user: &User,
    date: NaiveDate,
    mood: i32,
    reason: Option<&str>,
    anchor: NaiveDate,
) -> AppResult<DailyEntry> {
    sqlx::query_as::<_, DailyEntry>(
        r#"
        INSERT INTO daily_entries (id, user_id, entry_date, mood, week_number, day_name, reason, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (user_id, entry_date) DO UPDATE SET
            mood = EXCLUDED.mood,
            reason = EXCLUDED.reason,
            created_at = NOW()
        WHERE daily_entries.mood IS NULL
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(date)
    .bind(mood)
    .bind(calendar::week_number_of(anchor, date))
    .bind(calendar::day_name(date))
    .bind(reason)
    .fetch_optional(db)
    .await
    .map_err(AppError::from)
    .and_then(filled_or_conflict)
}

/// Best-effort AI comment on the submission reason. Failures are silent; the
/// entry is returned unchanged.
async fn attach_reason_comment(
    db: &PgPool,
    ai: &OpenAiClient,
    entry: DailyEntry,
) -> AppResult<DailyEntry> {
    let (Some(mood), Some(reason)) = (entry.mood, entry.reason.clone()) else {
        return Ok(entry);
    };
    let Some(comment) = ai.comment_on_reason(mood, &reason).await else {
        return Ok(entry);
    };
    let updated = sqlx::query_as::<_, DailyEntry>(
        "UPDATE daily_entries SET ai_comment = $2 WHERE id = $1 RETURNING *",
    )
    .bind(entry.id)
    .bind(&comment)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

/// Submit today's mood, then re-provision the rolling 7-day window.
pub async fn submit_today(
    db: &PgPool,
    ai: &OpenAiClient,
    user: &User,
    mood: i32,
    reason: Option<&str>,
    today: NaiveDate,
) -> AppResult<DailyEntry> {
    let anchor = user.anchor(today);
    let entry = fill_mood(db, user, today, mood, reason, anchor).await?;
    ensure_upcoming(db, user, today).await?;
    attach_reason_comment(db, ai, entry).await
}

/// Submit a mood for a past date: `anchor <= date < today`.
pub async fn submit_past(
    db: &PgPool,
    ai: &OpenAiClient,
    user: &User,
    date: NaiveDate,
    mood: i32,
    reason: Option<&str>,
    today: NaiveDate,
) -> AppResult<DailyEntry> {
    if date >= today {
        return Err(AppError::Validation(
            "Date must be in the past (before today)".into(),
        ));
    }
    let anchor = user.anchor(today);
    if date < anchor {
        return Err(AppError::Validation(
            "Date is before the start of mood tracking".into(),
        ));
    }
    let entry = fill_mood(db, user, date, mood, reason, anchor).await?;
    attach_reason_comment(db, ai, entry).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn rolling_window_includes_future_dates() {
        let today = d("2024-01-10");
        let dates = placeholder_dates(today, today + Duration::days(6), today, true);
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], today);
        assert_eq!(dates[6], d("2024-01-16"));
    }

    #[test]
    fn fixed_week_stops_at_today() {
        let today = d("2024-01-10");
        // week spanning [2024-01-08, 2024-01-14], only 3 days reached so far
        let dates = placeholder_dates(d("2024-01-08"), d("2024-01-14"), today, false);
        assert_eq!(dates, vec![d("2024-01-08"), d("2024-01-09"), d("2024-01-10")]);
    }

    #[test]
    fn fully_future_week_creates_nothing() {
        let today = d("2024-01-10");
        let dates = placeholder_dates(d("2024-02-05"), d("2024-02-11"), today, false);
        assert!(dates.is_empty());
    }

    #[test]
    fn fully_past_week_is_unaffected_by_future_rule() {
        let today = d("2024-03-01");
        let dates = placeholder_dates(d("2024-01-08"), d("2024-01-14"), today, false);
        assert_eq!(dates.len(), 7);
    }

    #[test]
    fn second_submission_for_a_date_conflicts() {
        let date = d("2024-01-10");
        let filled = DailyEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            entry_date: date,
            mood: Some(4),
            week_number: 2,
            day_name: calendar::day_name(date),
            reason: None,
            ai_comment: None,
            created_at: Some(chrono::Utc::now()),
        };

        // The winning submission gets the upserted row back.
        let first = filled_or_conflict(Some(filled)).unwrap();
        assert_eq!(first.mood, Some(4));

        // A resubmission finds the mood already set, the guarded update
        // applies to no row, and the empty result maps to a conflict.
        assert!(matches!(
            filled_or_conflict(None),
            Err(AppError::Conflict(_))
        ));
    }
}
