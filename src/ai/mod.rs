//! OpenAI-compatible chat client.
//!
//! Every public method returns `Option`: a missing key, timeout, non-2xx
//! status, or malformed reply all degrade to `None` and the caller falls back
//! to deterministic content. AI failures never fail a request.

use serde_json::Value;

use crate::config::Config;

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Clone)]
pub struct AiRecommendation {
    pub category: String,
    pub activities: Vec<String>,
    pub tips: String,
}

impl OpenAiClient {
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.openai_timeout_millis))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Suggest 3-6 short activities for a mood score. `None` when the client
    /// is unconfigured or the reply is unusable.
    pub async fn recommend_activities(
        &self,
        score: i32,
        category: &str,
        context: &str,
    ) -> Option<AiRecommendation> {
        if !self.enabled() {
            return None;
        }

        let system = r#"You suggest short, practical activities based on a mood score.
ALWAYS reply with JSON matching this schema:
{
  "category": "angry|sad|neutral|happy|joy",
  "activities": ["string", ... at least 3, at most 6],
  "tips": "one short sentence"
}
Keep suggestions safe and actionable. No text outside the JSON."#;
        let user = format!("Score: {score}\nCategory: {category}\nPreferences: {context}");

        let content = match self.chat(system, &user, 300, 0.7).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "AI recommendation unavailable");
                return None;
            }
        };

        let obj: Value = serde_json::from_str(&content).ok()?;
        let out_category = obj["category"].as_str().unwrap_or(category).to_string();
        let activities: Vec<String> = obj["activities"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let tips = obj["tips"].as_str().unwrap_or("").to_string();

        if activities.is_empty() || tips.is_empty() {
            return None;
        }
        Some(AiRecommendation {
            category: out_category,
            activities,
            tips,
        })
    }

    /// Short narrative comment on a completed week's category breakdown.
    pub async fn weekly_summary_comment(
        &self,
        breakdown_text: &str,
        profile_context: &str,
    ) -> Option<String> {
        if !self.enabled() {
            return None;
        }

        let system = r#"You are a warm, supportive assistant. Given a weekly mood
breakdown, reply with a short encouraging comment (2 sentences max).
ALWAYS return JSON: {"comment":"..."} with no other text."#;
        let user = format!("Weekly breakdown: {breakdown_text}\nProfile: {profile_context}");

        let content = match self.chat(system, &user, 160, 0.6).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "AI weekly comment unavailable");
                return None;
            }
        };

        let obj: Value = serde_json::from_str(&content).ok()?;
        let comment = obj["comment"].as_str().unwrap_or("");
        if comment.is_empty() {
            return None;
        }
        Some(comment.to_string())
    }

    /// Empathetic reply to the free-text reason attached to a mood entry.
    pub async fn comment_on_reason(&self, score: i32, reason: &str) -> Option<String> {
        if !self.enabled() || reason.trim().is_empty() {
            return None;
        }

        let system = r#"You are a friendly, supportive assistant. Reply briefly
(2 sentences max), empathetic and relevant to the user's reason and mood score.
ALWAYS return JSON: {"comment":"..."} with no other text."#;
        let user = format!("Score: {score}\nReason: {reason}");

        let content = match self.chat(system, &user, 120, 0.6).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "AI reason comment unavailable");
                return None;
            }
        };

        let obj: Value = serde_json::from_str(&content).ok()?;
        let comment = obj["comment"].as_str().unwrap_or("");
        if comment.is_empty() {
            return None;
        }
        Some(comment.to_string())
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, anyhow::Error> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user }
                ],
                "temperature": temperature,
                "max_tokens": max_tokens,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {}: {}", status, body);
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if content.is_empty() {
            anyhow::bail!("OpenAI API returned empty content");
        }
        Ok(content)
    }
}
