//! Next-activity recommendation
//!
//! [`recommend`] is the deterministic heuristic. [`Recommender`] wraps it with
//! an optional [`AdviceProvider`] that is consulted first under a timeout and
//! silently ignored when it fails.

pub mod advice;

pub use advice::{
    family_from_advice, parse_advice_text, AdviceError, AdviceProvider, AdviceRequest, AdviceResponse,
    GeminiAdvisor,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AdviceConfig;
use crate::progress::ProgressSnapshot;
use crate::types::ActivityFamily;

/// A family scoring below this is recommended
pub const WEAK_SCORE_THRESHOLD: f64 = 0.5;

/// Fixed denominator for the puzzle score, independent of the puzzle target
pub const PUZZLE_SCORE_DENOMINATOR: f64 = 10.0;

/// Fixed denominator for each free activity
pub const ACTIVITY_SCORE_DENOMINATOR: f64 = 10.0;

/// Default bound on the advice call
pub const DEFAULT_ADVICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-family scores the heuristic compares against [`WEAK_SCORE_THRESHOLD`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilyScores {
    pub avg_flashcard: f64,
    pub puzzle_score: f64,
    pub avg_activity: f64,
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

/// Score each leveled family
pub fn family_scores(snapshot: &ProgressSnapshot) -> FamilyScores {
    FamilyScores {
        avg_flashcard: average(snapshot.flashcards().values().map(|s| s.completion_ratio())),
        puzzle_score: f64::from(snapshot.puzzles().completed_count()) / PUZZLE_SCORE_DENOMINATOR,
        avg_activity: average(
            snapshot
                .activities()
                .values()
                .map(|s| f64::from(s.completed_count()) / ACTIVITY_SCORE_DENOMINATOR),
        ),
    }
}

/// First family scoring below [`WEAK_SCORE_THRESHOLD`], checked in the order
/// flashcards, puzzles, activities. Defaults to flashcards.
pub fn recommend(snapshot: &ProgressSnapshot) -> ActivityFamily {
    let scores = family_scores(snapshot);
    let ranked = [
        (ActivityFamily::Flashcards, scores.avg_flashcard),
        (ActivityFamily::Puzzles, scores.puzzle_score),
        (ActivityFamily::Activities, scores.avg_activity),
    ];

    ranked
        .iter()
        .find(|(_, score)| *score < WEAK_SCORE_THRESHOLD)
        .map(|(family, _)| *family)
        .unwrap_or(ActivityFamily::Flashcards)
}

/// Where a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Advisor,
    Heuristic,
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationSource::Advisor => write!(f, "advisor"),
            RecommendationSource::Heuristic => write!(f, "heuristic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub family: ActivityFamily,
    pub source: RecommendationSource,
    /// Advisor's explanation, when it answered
    pub reason: Option<String>,
}

impl Recommendation {
    fn heuristic(snapshot: &ProgressSnapshot) -> Self {
        Self {
            family: recommend(snapshot),
            source: RecommendationSource::Heuristic,
            reason: None,
        }
    }
}

/// Recommendation with an optional advisor in front of the heuristic
pub struct Recommender {
    advisor: Option<Arc<dyn AdviceProvider>>,
    timeout: Duration,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::heuristic_only()
    }
}

impl Recommender {
    pub fn new(advisor: Option<Arc<dyn AdviceProvider>>, timeout: Duration) -> Self {
        Self { advisor, timeout }
    }

    pub fn heuristic_only() -> Self {
        Self::new(None, DEFAULT_ADVICE_TIMEOUT)
    }

    /// Gemini-backed recommender when configured, heuristic otherwise
    pub fn from_config(config: &AdviceConfig) -> Self {
        let advisor = match GeminiAdvisor::from_config(config) {
            Ok(advisor) => Some(Arc::new(advisor) as Arc<dyn AdviceProvider>),
            Err(e) => {
                debug!("{}, using heuristic recommendations only", e);
                None
            }
        };
        Self::new(advisor, Duration::from_millis(config.timeout_ms))
    }

    pub fn has_advisor(&self) -> bool {
        self.advisor.is_some()
    }

    /// Recommend the next family. Never fails: advisor problems fall back to [`recommend`].
    pub async fn recommend(&self, snapshot: &ProgressSnapshot) -> Recommendation {
        let Some(advisor) = &self.advisor else {
            return Recommendation::heuristic(snapshot);
        };

        let request = AdviceRequest::from_snapshot(snapshot);
        let result = tokio::time::timeout(self.timeout, advisor.advise(&request)).await;

        let advice = match result {
            Ok(Ok(advice)) => advice,
            Ok(Err(e)) => {
                warn!("{} advice failed, falling back to heuristic: {}", advisor.name(), e);
                return Recommendation::heuristic(snapshot);
            }
            Err(_) => {
                let e = AdviceError::Timeout(self.timeout.as_millis() as u64);
                warn!("{} advice failed, falling back to heuristic: {}", advisor.name(), e);
                return Recommendation::heuristic(snapshot);
            }
        };

        match advice.family() {
            Some(family) => {
                info!("{} recommends {}", advisor.name(), family);
                Recommendation {
                    family,
                    source: RecommendationSource::Advisor,
                    reason: advice.reason,
                }
            }
            None => {
                warn!(
                    "{} advice {:?} names no known activity, falling back to heuristic",
                    advisor.name(),
                    advice.recommended_activity
                );
                Recommendation::heuristic(snapshot)
            }
        }
    }
}
