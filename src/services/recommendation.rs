//! Memoized activity recommendations.
//!
//! Recommendations are a pure function of `(kind, user, score, context)`, so
//! results are cached in-process for the lifetime of the service: at most one
//! AI call per distinct key, every caller gets a defensive copy, and cache
//! hits are flagged `cached`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::weekly_stats::category_of;
use crate::services::{load_user, mood_window, profile};
use crate::AppState;

pub const PROMPT_VERSION_AI: &str = "v1-ai";
pub const PROMPT_VERSION_FALLBACK: &str = "v1-fallback";

const MAX_CONTEXT_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub score: i32,
    pub category: String,
    pub activities: Vec<String>,
    pub tips: String,
    pub prompt_version: String,
    pub cached: bool,
}

/// In-process recommendation memoizer. Owned by the service state (not a
/// global) so tests can use a fresh instance. Entries are never mutated or
/// expired; a concurrent race on the same key keeps the first writer's value.
#[derive(Clone, Default)]
pub struct RecommendationCache {
    entries: Arc<Mutex<HashMap<String, Recommendation>>>,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored value, flagged as a cache hit.
    pub async fn get(&self, key: &str) -> Option<Recommendation> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|r| {
            let mut copy = r.clone();
            copy.cached = true;
            copy
        })
    }

    /// Insert unless the key already exists; returns a copy of the winning
    /// value either way.
    pub async fn put_if_absent(&self, key: &str, value: Recommendation) -> Recommendation {
        let mut entries = self.entries.lock().await;
        entries.entry(key.to_string()).or_insert(value).clone()
    }

    /// At-most-once computation per key within process lifetime. The first
    /// call for a key invokes `compute` and returns the result unflagged;
    /// later calls return stored copies flagged `cached`.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> AppResult<Recommendation>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = AppResult<Recommendation>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let computed = compute().await?;
        Ok(self.put_if_absent(key, computed).await)
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyRecommendationRequest {
    pub score: Option<i32>,
    pub context: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct WeekRecommendationRequest {
    pub user_id: Uuid,
    pub week_number: i32,
    pub context: Option<String>,
}

pub fn clamp_score(score: Option<i32>) -> i32 {
    score.unwrap_or(1).clamp(1, 5)
}

/// Trimmed free-text context, capped for cache keys and prompts.
pub fn normalize_context(context: Option<&str>) -> String {
    let trimmed = context.unwrap_or("").trim();
    trimmed.chars().take(MAX_CONTEXT_CHARS).collect()
}

pub async fn recommend_daily(
    state: &AppState,
    req: &DailyRecommendationRequest,
    today: NaiveDate,
) -> AppResult<Recommendation> {
    let score = clamp_score(req.score);
    let context = normalize_context(req.context.as_deref());
    let category = category_of(score);

    // Profile enrichment is additive: an unknown user id falls back to the
    // anonymous key and plain context.
    let (user_key, extended_context) = match req.user_id {
        Some(id) => match load_user(&state.db, id).await {
            Ok(user) => (id.to_string(), profile::enrich_context(&user, &context, today)),
            Err(_) => ("anon".to_string(), context),
        },
        None => ("anon".to_string(), context),
    };

    let key = format!("daily|user={user_key}|score={score}|ctx={extended_context}");
    resolve(state, &key, score, category, &extended_context).await
}

pub async fn recommend_for_week(
    state: &AppState,
    req: &WeekRecommendationRequest,
    today: NaiveDate,
) -> AppResult<Recommendation> {
    let user = load_user(&state.db, req.user_id).await?;
    let average =
        mood_window::average_mood_for_week(&state.db, &user, req.week_number, today).await?;
    let score = clamp_score(Some(average.round() as i32));
    let context = normalize_context(req.context.as_deref());
    let extended_context = profile::enrich_context(&user, &context, today);
    let category = category_of(score);

    let key = format!(
        "week|user={}|week={}|score={score}|ctx={extended_context}",
        user.id, req.week_number
    );
    resolve(state, &key, score, category, &extended_context).await
}

async fn resolve(
    state: &AppState,
    key: &str,
    score: i32,
    base_category: &str,
    context: &str,
) -> AppResult<Recommendation> {
    state
        .recommendations
        .get_or_compute(key, || async {
            match state.ai.recommend_activities(score, base_category, context).await {
                Some(ai) => Ok(Recommendation {
                    score,
                    category: if ai.category.is_empty() {
                        base_category.to_string()
                    } else {
                        ai.category
                    },
                    activities: ai.activities,
                    tips: ai.tips,
                    prompt_version: PROMPT_VERSION_AI.to_string(),
                    cached: false,
                }),
                None => Ok(Recommendation {
                    score,
                    category: base_category.to_string(),
                    activities: fallback_activities(base_category),
                    tips: fallback_tips(base_category).to_string(),
                    prompt_version: PROMPT_VERSION_FALLBACK.to_string(),
                    cached: false,
                }),
            }
        })
        .await
}

/// Static activity table used when the AI collaborator is absent or fails.
pub fn fallback_activities(category: &str) -> Vec<String> {
    let items: &[&str] = match category {
        "angry" => &[
            "Box-breathe 4-4-4-4 for 3 minutes",
            "Step away from the trigger for a short pause",
            "Write down what you are feeling (2-3 sentences)",
            "Drink some water and splash your face",
        ],
        "sad" => &[
            "Call a friend or family member for 5 minutes",
            "Take a slow 10-minute walk with gentle music",
            "Write down one thing you are grateful for",
            "Do 5 minutes of light stretching",
        ],
        "neutral" => &[
            "Tidy your desk for 5 minutes",
            "Finish one small task (15 minutes or less)",
            "Plan your top 3 priorities for today",
            "Drink water and do a quick stretch",
        ],
        "happy" => &[
            "Tackle one challenging task for 25 minutes",
            "Do a small act of kindness for someone",
            "Get 10-15 minutes of exercise",
            "Spend 20 minutes on a hobby",
        ],
        _ => &[
            "Celebrate a small win (write 1-2 lines)",
            "Help someone or share a positive story",
            "Plan the next step toward one of your goals",
            "Enjoy a mindful moment for 3 minutes",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

pub fn fallback_tips(category: &str) -> &'static str {
    match category {
        "angry" => "Lower the intensity first, respond once you are calm.",
        "sad" => "Give the feeling some room, moving slowly is enough.",
        "neutral" => "Start with a small step to build momentum.",
        "happy" => "Channel the energy into something meaningful and measurable.",
        _ => "Enjoy the good moment while keeping a healthy rhythm.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample(score: i32) -> Recommendation {
        Recommendation {
            score,
            category: "neutral".into(),
            activities: fallback_activities("neutral"),
            tips: fallback_tips("neutral").into(),
            prompt_version: PROMPT_VERSION_FALLBACK.into(),
            cached: false,
        }
    }

    #[tokio::test]
    async fn compute_runs_at_most_once_per_key() {
        let cache = RecommendationCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample(3))
            })
            .await
            .unwrap();
        let second = cache
            .get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample(3))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!first.cached, "first result is a fresh computation");
        assert!(second.cached, "second result is a cache hit");
        assert_eq!(second.score, 3);
    }

    #[tokio::test]
    async fn different_keys_compute_independently() {
        let cache = RecommendationCache::new();
        let calls = AtomicUsize::new(0);

        for key in ["a", "b"] {
            cache
                .get_or_compute(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample(2))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn put_if_absent_keeps_first_value() {
        let cache = RecommendationCache::new();
        let kept = cache.put_if_absent("k", sample(1)).await;
        let ignored = cache.put_if_absent("k", sample(5)).await;
        assert_eq!(kept.score, 1);
        assert_eq!(ignored.score, 1);
    }

    #[tokio::test]
    async fn cached_copies_do_not_alias_the_store() {
        let cache = RecommendationCache::new();
        cache.put_if_absent("k", sample(2)).await;
        let mut copy = cache.get("k").await.unwrap();
        copy.activities.clear();
        let again = cache.get("k").await.unwrap();
        assert!(!again.activities.is_empty());
    }

    #[test]
    fn score_clamping() {
        assert_eq!(clamp_score(None), 1);
        assert_eq!(clamp_score(Some(0)), 1);
        assert_eq!(clamp_score(Some(9)), 5);
        assert_eq!(clamp_score(Some(4)), 4);
    }

    #[test]
    fn context_normalization_trims_and_caps() {
        assert_eq!(normalize_context(None), "");
        assert_eq!(normalize_context(Some("  hiking  ")), "hiking");
        let long = "x".repeat(500);
        assert_eq!(normalize_context(Some(&long)).chars().count(), 200);
    }

    #[test]
    fn fallback_tables_cover_every_category() {
        for category in ["angry", "sad", "neutral", "happy", "joy"] {
            let activities = fallback_activities(category);
            assert!(
                (3..=6).contains(&activities.len()),
                "{category} must have 3-6 activities"
            );
            assert!(!fallback_tips(category).is_empty());
        }
    }
}
