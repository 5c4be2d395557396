//! External advice collaborator
//!
//! The recommender may ask a language model what the learner should try next.
//! Everything here is best-effort: errors are reported to the caller, who
//! logs them and falls back to the heuristic.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::AdviceConfig;
use crate::progress::ProgressSnapshot;
use crate::types::{ActivityFamily, ActivityOutcome};

/// Most recent outcomes sent along with the snapshot
pub const ADVICE_HISTORY_LEN: usize = 10;

static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("json block pattern is valid"));

/// Keywords searched in the recommended activity, in priority order
const FAMILY_KEYWORDS: [(&str, ActivityFamily); 6] = [
    ("flashcards", ActivityFamily::Flashcards),
    ("puzzles", ActivityFamily::Puzzles),
    ("activities", ActivityFamily::Activities),
    ("matching", ActivityFamily::Activities),
    ("sorting", ActivityFamily::Activities),
    ("memory", ActivityFamily::Activities),
];

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("advice service is not configured")]
    NotConfigured,

    #[error("advice request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("advice service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("advice service timed out after {0} ms")]
    Timeout(u64),

    #[error("malformed advice payload: {0}")]
    Malformed(String),
}

/// What the collaborator is asked about
#[derive(Debug, Clone, Serialize)]
pub struct AdviceRequest {
    pub snapshot: ProgressSnapshot,
    /// Newest first, at most [`ADVICE_HISTORY_LEN`] entries
    pub recent_history: Vec<ActivityOutcome>,
}

impl AdviceRequest {
    pub fn from_snapshot(snapshot: &ProgressSnapshot) -> Self {
        Self {
            recent_history: snapshot.recent_history(ADVICE_HISTORY_LEN),
            snapshot: snapshot.clone(),
        }
    }
}

/// Structured advice; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceResponse {
    pub recommended_activity: Option<String>,
    pub reason: Option<String>,
    pub skills_developed: Vec<String>,
    pub encouragement: Option<String>,
    pub difficulty_level: Option<String>,
}

impl AdviceResponse {
    /// Family named by `recommended_activity`, if it maps to a leveled family
    pub fn family(&self) -> Option<ActivityFamily> {
        self.recommended_activity.as_deref().and_then(family_from_advice)
    }
}

/// Port to an external advice service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResponse, AdviceError>;
}

/// Map free text such as "Try the Memory game" onto an activity family
pub fn family_from_advice(recommended_activity: &str) -> Option<ActivityFamily> {
    let text = recommended_activity.to_lowercase();
    FAMILY_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, family)| *family)
}

/// Pull the first `{ ... }` block out of model output and parse it
pub fn parse_advice_text(text: &str) -> Result<AdviceResponse, AdviceError> {
    let block = JSON_BLOCK
        .find(text)
        .ok_or_else(|| AdviceError::Malformed("no JSON object in response".to_string()))?;

    let response: AdviceResponse =
        serde_json::from_str(block.as_str()).map_err(|e| AdviceError::Malformed(e.to_string()))?;

    if response.recommended_activity.is_none() {
        return Err(AdviceError::Malformed("missing recommended_activity".to_string()));
    }
    Ok(response)
}

/// Gemini `generateContent` client
pub struct GeminiAdvisor {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiAdvisor {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    /// Build from config; [`AdviceError::NotConfigured`] when disabled or the key is not in the environment
    pub fn from_config(config: &AdviceConfig) -> Result<Self, AdviceError> {
        if !config.enabled {
            return Err(AdviceError::NotConfigured);
        }
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AdviceError::NotConfigured)?;

        let mut advisor = Self::new(config.endpoint.clone(), api_key);
        advisor.temperature = config.temperature;
        advisor.max_output_tokens = config.max_output_tokens;
        Ok(advisor)
    }

    fn prompt(request: &AdviceRequest) -> Result<String, AdviceError> {
        let progress = serde_json::to_string(&request.snapshot).map_err(|e| AdviceError::Malformed(e.to_string()))?;
        let history =
            serde_json::to_string(&request.recent_history).map_err(|e| AdviceError::Malformed(e.to_string()))?;

        Ok(format!(
            r#"You are an educational AI assistant helping children with autism learn.

Child's Progress:
- Current Level: {level}
- Completed Activities: {progress}
- Recent Activity History: {history}

Based on this progress, suggest:
1. What activity the child should try next
2. Why this activity is recommended
3. What skills they're developing
4. Any encouragement or tips

Respond with a JSON object:
{{
  "recommended_activity": "activity name",
  "reason": "why this is recommended",
  "skills_developed": ["skill1", "skill2"],
  "encouragement": "positive message",
  "difficulty_level": "easy/medium/hard"
}}"#,
            level = request.snapshot.current_level(),
        ))
    }
}

#[async_trait]
impl AdviceProvider for GeminiAdvisor {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn advise(&self, request: &AdviceRequest) -> Result<AdviceResponse, AdviceError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": Self::prompt(request)? }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdviceError::Status { status, body });
        }

        let raw: serde_json::Value = response.json().await?;
        let text = raw
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AdviceError::Malformed("response has no candidate text".to_string()))?;

        debug!("Gemini advice text: {}", text);
        parse_advice_text(text)
    }
}
