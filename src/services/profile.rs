//! Optional profile context used to enrich AI prompts. Purely additive;
//! missing or malformed profile data just yields a shorter string.

use chrono::NaiveDate;

use crate::models::user::User;

const MAX_HOBBIES: usize = 6;
const MAX_CONTEXT_CHARS: usize = 400;

/// Profile-only context (no base text).
pub fn context_of(user: &User, today: NaiveDate) -> String {
    enrich_context(user, "", today)
}

/// Append `age:`, `gender:` and `hobbies:` segments to a base context,
/// joined by ` | ` and capped at 400 chars.
pub fn enrich_context(user: &User, base: &str, today: NaiveDate) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !base.trim().is_empty() {
        parts.push(base.trim().to_string());
    }

    if let Some(birth_date) = user.birth_date {
        if let Some(age) = today.years_since(birth_date) {
            if age > 0 && age < 120 {
                parts.push(format!("age:{age}"));
            }
        }
    }

    if let Some(gender) = user.gender.as_deref() {
        if !gender.trim().is_empty() {
            parts.push(format!("gender:{}", gender.trim()));
        }
    }

    let hobbies = user.hobby_list();
    if !hobbies.is_empty() {
        let shown = &hobbies[..hobbies.len().min(MAX_HOBBIES)];
        parts.push(format!("hobbies:{}", shown.join(",")));
    }

    parts.join(" | ").chars().take(MAX_CONTEXT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(
        birth_date: Option<&str>,
        gender: Option<&str>,
        hobbies: Option<Vec<&str>>,
    ) -> User {
        User {
            id: Uuid::new_v4(),
            username: "tester".into(),
            password_hash: String::new(),
            first_login: None,
            last_login: None,
            birth_date: birth_date.map(|s| s.parse().unwrap()),
            gender: gender.map(str::to_string),
            hobbies: hobbies
                .map(|h| sqlx::types::Json(h.into_iter().map(str::to_string).collect())),
            created_at: Utc::now(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn full_profile_context() {
        let u = user(Some("1994-06-15"), Some("female"), Some(vec!["hiking", "piano"]));
        let ctx = enrich_context(&u, "prefers mornings", d("2024-03-01"));
        assert_eq!(ctx, "prefers mornings | age:29 | gender:female | hobbies:hiking,piano");
    }

    #[test]
    fn empty_profile_yields_base_only() {
        let u = user(None, None, None);
        assert_eq!(enrich_context(&u, "  running ", d("2024-03-01")), "running");
        assert_eq!(context_of(&u, d("2024-03-01")), "");
    }

    #[test]
    fn hobbies_are_capped_at_six() {
        let u = user(None, None, Some(vec!["a", "b", "c", "d", "e", "f", "g", "h"]));
        let ctx = context_of(&u, d("2024-03-01"));
        assert_eq!(ctx, "hobbies:a,b,c,d,e,f");
    }

    #[test]
    fn implausible_age_is_skipped() {
        let u = user(Some("1890-01-01"), None, None);
        assert_eq!(context_of(&u, d("2024-03-01")), "");
    }

    #[test]
    fn context_is_capped_at_400_chars() {
        let u = user(None, None, None);
        let base = "x".repeat(1000);
        assert_eq!(enrich_context(&u, &base, d("2024-03-01")).chars().count(), 400);
    }
}
