//! Weekly aggregation with fingerprint-based cache invalidation.
//!
//! A week's stats (and the AI narrative behind them) are computed once per
//! distinct week content. The fingerprint walks the 7 canonical dates of the
//! week so "day absent" and "day filled" are always distinguished, and the
//! stored row is only rewritten when the fingerprint changes.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use sqlx::types::Json;
use uuid::Uuid;

use crate::calendar;
use crate::error::AppResult;
use crate::models::daily_entry::DailyEntry;
use crate::models::user::User;
use crate::models::weekly_stats::{CategoryShare, WeeklyStats, WeeklyStatsResponse};
use crate::services::{mood_window, profile, recommendation};
use crate::AppState;

/// Mood bucket for a submitted score. Scores are validated to 1..=5 before
/// they reach storage, so the catch-all only ever sees 5.
pub fn category_of(mood: i32) -> &'static str {
    match mood {
        1 => "angry",
        2 => "sad",
        3 => "neutral",
        4 => "happy",
        _ => "joy",
    }
}

#[derive(Debug)]
pub struct WeekAggregate {
    pub filled_count: i32,
    pub complete: bool,
    pub average: Option<f64>,
    pub breakdown: Vec<CategoryShare>,
}

/// Aggregate a week's entries. A week is complete iff exactly 7 entries exist
/// and all 7 have a mood; otherwise only the filled count is reported and
/// average/breakdown are withheld rather than computed on partial data.
pub fn aggregate(entries: &[DailyEntry]) -> WeekAggregate {
    let moods: Vec<i32> = entries.iter().filter_map(|e| e.mood).collect();
    let filled_count = moods.len() as i32;
    let complete = entries.len() == 7 && filled_count == 7;

    if !complete {
        return WeekAggregate {
            filled_count,
            complete: false,
            average: None,
            breakdown: Vec::new(),
        };
    }

    let average = (moods.iter().sum::<i32>() as f64 / 7.0).clamp(0.0, 5.0);

    // Counts keyed in encounter order; the stable sort below keeps that order
    // for equal percentages.
    let mut counts: Vec<(&'static str, u32)> = Vec::new();
    for mood in &moods {
        let category = category_of(*mood);
        match counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((category, 1)),
        }
    }
    let mut breakdown: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(category, n)| CategoryShare {
            category: category.to_string(),
            percent: n as f64 * 100.0 / 7.0,
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.percent
            .partial_cmp(&a.percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    WeekAggregate {
        filled_count,
        complete: true,
        average: Some(average),
        breakdown,
    }
}

/// Canonical content fingerprint of a week: the 7 dates of the week in order,
/// each as `date:mood` with `_` for an unfilled or absent day.
pub fn fingerprint(anchor: NaiveDate, week_number: i32, entries: &[DailyEntry]) -> String {
    let (start, _) = calendar::range_of_week(anchor, week_number);
    let mood_by_date: HashMap<NaiveDate, Option<i32>> = entries
        .iter()
        .map(|e| (e.entry_date, e.mood))
        .collect();

    (0..7)
        .map(|i| {
            let date = start + Duration::days(i);
            match mood_by_date.get(&date).copied().flatten() {
                Some(mood) => format!("{date}:{mood}"),
                None => format!("{date}:_"),
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Human-readable breakdown line, e.g. `28.6% Neutral, 14.3% Sad`.
pub fn breakdown_summary(breakdown: &[CategoryShare]) -> String {
    breakdown
        .iter()
        .map(|cs| format!("{:.1}% {}", cs.percent, capitalize(&cs.category)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// What to do with a stats request given the stored row's fingerprint, the
/// fingerprint of the live entries, and week completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Stored row predates fingerprinting: stamp it, reuse its stats as-is.
    Backfill,
    /// Stored fingerprint matches the live content: reuse, no recompute.
    Hit,
    /// Content changed and the week is complete: recompute and persist.
    RecomputePersist,
    /// Content changed but the week is incomplete: transient result only,
    /// nothing is written.
    TransientIncomplete,
}

/// The cache policy in one place: `Backfill` and `Hit` reuse the stored row
/// without recomputing, so the narrative and recommendation collaborators
/// only ever run on `RecomputePersist`.
pub fn cache_decision(
    stored_fingerprint: Option<&str>,
    current_fingerprint: &str,
    complete: bool,
) -> CacheDecision {
    match stored_fingerprint {
        Some("") => CacheDecision::Backfill,
        Some(fp) if fp == current_fingerprint => CacheDecision::Hit,
        _ if complete => CacheDecision::RecomputePersist,
        _ => CacheDecision::TransientIncomplete,
    }
}

async fn find_stats(
    db: &sqlx::PgPool,
    user_id: Uuid,
    week_number: i32,
) -> AppResult<Option<WeeklyStats>> {
    let stats = sqlx::query_as::<_, WeeklyStats>(
        "SELECT * FROM weekly_stats WHERE user_id = $1 AND week_number = $2",
    )
    .bind(user_id)
    .bind(week_number)
    .fetch_optional(db)
    .await?;
    Ok(stats)
}

/// Fingerprint-cached weekly stats.
///
/// Reuses the persisted row verbatim when the stored fingerprint matches the
/// live entries (no recompute, no AI call). On mismatch, recomputes; an
/// incomplete week is returned transiently and never overwrites a previously
/// persisted complete week. Only a complete recompute triggers the AI
/// narrative and activity generation, after which the row is upserted with
/// the new fingerprint.
pub async fn get_or_create(
    state: &AppState,
    user: &User,
    week: Option<i32>,
    today: NaiveDate,
) -> AppResult<WeeklyStatsResponse> {
    let anchor = user.anchor(today);
    let week_number = match week {
        Some(w) => w.max(1),
        None => calendar::week_number_of(anchor, today),
    };

    let entries = mood_window::get_week(&state.db, user, week_number, today).await?;
    let current_fp = fingerprint(anchor, week_number, &entries);
    let existing = find_stats(&state.db, user.id, week_number).await?;
    let agg = aggregate(&entries);

    let decision = cache_decision(
        existing.as_ref().map(|ws| ws.fingerprint.as_str()),
        &current_fp,
        agg.complete,
    );

    match (decision, existing) {
        (CacheDecision::Backfill, Some(ws)) => {
            // Legacy row saved before fingerprinting: stamp it once, keep the
            // stored stats untouched.
            sqlx::query("UPDATE weekly_stats SET fingerprint = $2 WHERE id = $1")
                .bind(ws.id)
                .bind(&current_fp)
                .execute(&state.db)
                .await?;
            return Ok(ws.into());
        }
        (CacheDecision::Hit, Some(ws)) => {
            tracing::debug!(user_id = %user.id, week_number, "weekly stats fingerprint hit");
            return Ok(ws.into());
        }
        // Never cache a partial week, and never replace a stored complete
        // week with an incomplete observation.
        (CacheDecision::TransientIncomplete, Some(ws)) => return Ok(ws.into()),
        (CacheDecision::TransientIncomplete, None) => {
            return Ok(WeeklyStatsResponse::incomplete(week_number, agg.filled_count));
        }
        // RecomputePersist; Backfill and Hit always carry a stored row.
        (_, _) => {}
    }

    let breakdown_text = breakdown_summary(&agg.breakdown);
    let profile_context = profile::context_of(user, today);
    let ai_comment = state
        .ai
        .weekly_summary_comment(&breakdown_text, &profile_context)
        .await
        .unwrap_or_else(|| format!("{breakdown_text}. Keep looking after your emotional health."));

    let rec = recommendation::recommend_for_week(
        state,
        &recommendation::WeekRecommendationRequest {
            user_id: user.id,
            week_number,
            context: None,
        },
        today,
    )
    .await?;

    let ws = sqlx::query_as::<_, WeeklyStats>(
        r#"
        INSERT INTO weekly_stats
            (id, user_id, week_number, average_score, entries_count, breakdown, ai_comment, activities, fingerprint, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (user_id, week_number) DO UPDATE SET
            average_score = EXCLUDED.average_score,
            entries_count = EXCLUDED.entries_count,
            breakdown = EXCLUDED.breakdown,
            ai_comment = EXCLUDED.ai_comment,
            activities = EXCLUDED.activities,
            fingerprint = EXCLUDED.fingerprint,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(week_number)
    .bind(agg.average)
    .bind(agg.filled_count)
    .bind(Json(agg.breakdown.clone()))
    .bind(&ai_comment)
    .bind(Json(rec.activities.clone()))
    .bind(&current_fp)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, week_number, "weekly stats recomputed and persisted");
    Ok(ws.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn entry(date: &str, mood: Option<i32>) -> DailyEntry {
        let date = d(date);
        DailyEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            entry_date: date,
            mood,
            week_number: 1,
            day_name: calendar::day_name(date),
            reason: None,
            ai_comment: None,
            created_at: mood.map(|_| Utc::now()),
        }
    }

    fn full_week(moods: [i32; 7]) -> Vec<DailyEntry> {
        moods
            .iter()
            .enumerate()
            .map(|(i, m)| entry(&format!("2024-01-0{}", i + 1), Some(*m)))
            .collect()
    }

    #[test]
    fn complete_week_average_and_breakdown() {
        let agg = aggregate(&full_week([3, 4, 2, 5, 1, 3, 4]));
        assert!(agg.complete);
        assert_eq!(agg.filled_count, 7);
        let avg = agg.average.unwrap();
        assert!((avg - 22.0 / 7.0).abs() < 1e-9);

        let categories: Vec<&str> = agg.breakdown.iter().map(|c| c.category.as_str()).collect();
        // neutral and happy tie at 2/7, then 1/7 each in encounter order
        assert_eq!(categories, vec!["neutral", "happy", "sad", "joy", "angry"]);
        assert!((agg.breakdown[0].percent - 200.0 / 7.0).abs() < 1e-9);
        assert!((agg.breakdown[2].percent - 100.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn incomplete_week_withholds_average() {
        let mut entries = full_week([3, 4, 2, 5, 1, 3, 4]);
        entries[3].mood = None;
        let agg = aggregate(&entries);
        assert!(!agg.complete);
        assert_eq!(agg.filled_count, 6);
        assert!(agg.average.is_none());
        assert!(agg.breakdown.is_empty());
    }

    #[test]
    fn fewer_than_seven_entries_is_incomplete() {
        let entries: Vec<DailyEntry> = full_week([5, 5, 5, 5, 5, 5, 5])
            .into_iter()
            .take(6)
            .collect();
        let agg = aggregate(&entries);
        assert!(!agg.complete);
        assert_eq!(agg.filled_count, 6);
    }

    #[test]
    fn fingerprint_is_stable() {
        let anchor = d("2024-01-01");
        let entries = full_week([3, 4, 2, 5, 1, 3, 4]);
        let a = fingerprint(anchor, 1, &entries);
        let b = fingerprint(anchor, 1, &entries);
        assert_eq!(a, b);
        assert_eq!(
            a,
            "2024-01-01:3|2024-01-02:4|2024-01-03:2|2024-01-04:5|2024-01-05:1|2024-01-06:3|2024-01-07:4"
        );
    }

    #[test]
    fn fingerprint_changes_with_any_mood() {
        let anchor = d("2024-01-01");
        let base = full_week([3, 4, 2, 5, 1, 3, 4]);
        let before = fingerprint(anchor, 1, &base);
        for i in 0..7 {
            let mut changed = base.clone();
            changed[i].mood = Some(changed[i].mood.unwrap() % 5 + 1);
            assert_ne!(fingerprint(anchor, 1, &changed), before);
        }
    }

    #[test]
    fn fingerprint_distinguishes_absent_from_unfilled_position() {
        let anchor = d("2024-01-01");
        // a missing row and an unfilled placeholder both render as `_`,
        // never as a numeric value
        let with_placeholder = vec![entry("2024-01-01", None)];
        let fp = fingerprint(anchor, 1, &with_placeholder);
        assert!(fp.starts_with("2024-01-01:_|"));
        assert_eq!(fp, fingerprint(anchor, 1, &[]));
    }

    #[test]
    fn breakdown_summary_formats_percentages() {
        let agg = aggregate(&full_week([3, 4, 2, 5, 1, 3, 4]));
        let text = breakdown_summary(&agg.breakdown);
        assert!(text.starts_with("28.6% Neutral, 28.6% Happy"));
        assert!(text.contains("14.3% Angry"));
    }

    #[test]
    fn collaborators_run_at_most_once_for_unchanged_content() {
        let anchor = d("2024-01-01");
        let entries = full_week([3, 4, 2, 5, 1, 3, 4]);
        let fp = fingerprint(anchor, 1, &entries);

        // First observation of a complete week computes and persists.
        assert_eq!(
            cache_decision(None, &fp, true),
            CacheDecision::RecomputePersist
        );
        // Every later call with unchanged content is a hit; only
        // RecomputePersist runs the narrative/recommendation collaborators.
        for _ in 0..3 {
            assert_eq!(cache_decision(Some(&fp), &fp, true), CacheDecision::Hit);
        }
    }

    #[test]
    fn changed_content_recomputes_when_complete() {
        let anchor = d("2024-01-01");
        let before = fingerprint(anchor, 1, &full_week([3, 4, 2, 5, 1, 3, 4]));
        let after = fingerprint(anchor, 1, &full_week([3, 4, 2, 5, 1, 3, 5]));
        assert_eq!(
            cache_decision(Some(&before), &after, true),
            CacheDecision::RecomputePersist
        );
    }

    #[test]
    fn legacy_row_is_stamped_without_recompute() {
        // An empty stored fingerprint wins over every other rule.
        assert_eq!(cache_decision(Some(""), "x:1", true), CacheDecision::Backfill);
        assert_eq!(cache_decision(Some(""), "x:_", false), CacheDecision::Backfill);
    }

    #[test]
    fn incomplete_week_never_persists_or_overwrites() {
        // No stored row: a transient response, nothing written.
        assert_eq!(
            cache_decision(None, "x:_", false),
            CacheDecision::TransientIncomplete
        );
        // Stored complete row with different content: the stored row is kept.
        assert_eq!(
            cache_decision(Some("x:3"), "x:_", false),
            CacheDecision::TransientIncomplete
        );
    }

    #[test]
    fn matching_fingerprint_hits_regardless_of_completeness() {
        assert_eq!(cache_decision(Some("x:3"), "x:3", true), CacheDecision::Hit);
        assert_eq!(cache_decision(Some("x:_"), "x:_", false), CacheDecision::Hit);
    }

    #[test]
    fn category_mapping() {
        assert_eq!(category_of(1), "angry");
        assert_eq!(category_of(2), "sad");
        assert_eq!(category_of(3), "neutral");
        assert_eq!(category_of(4), "happy");
        assert_eq!(category_of(5), "joy");
    }
}
