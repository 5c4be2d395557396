//! Graded matching of a spoken transcript against an expected answer

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normalize::normalize;
use super::variations::variations_of;

/// Shortest transcript accepted as a partial answer to a longer expected answer
pub const MIN_PARTIAL_ANSWER_CHARS: usize = 2;

pub const CONFIDENCE_EXACT: f32 = 1.0;
pub const CONFIDENCE_SPOKEN_CONTAINS_EXPECTED: f32 = 0.8;
pub const CONFIDENCE_PARTIAL: f32 = 0.7;
pub const CONFIDENCE_VARIATION: f32 = 0.6;

/// Which rule produced a verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variation", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    SpokenContainsExpected,
    ExpectedContainsSpoken,
    /// Matched an accepted phrasing (the canonical variation is attached)
    Variation(String),
    NoMatch,
}

/// Outcome of checking one spoken answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub is_match: bool,
    /// 0.0 exactly when `is_match` is false
    pub confidence: f32,
    pub kind: MatchKind,
}

impl Verification {
    fn matched(kind: MatchKind, confidence: f32) -> Self {
        Self {
            is_match: true,
            confidence,
            kind,
        }
    }

    fn no_match() -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            kind: MatchKind::NoMatch,
        }
    }
}

/// Check `spoken` against `expected`. Rules are tried in order, first hit wins:
///
/// 1. canonical forms equal → 1.0
/// 2. transcript contains the expected answer → 0.8
/// 3. expected answer contains the transcript → 0.7
/// 4. transcript equals or contains an accepted variation → 0.6
/// 5. otherwise no match, 0.0
pub fn verify(spoken: &str, expected: &str) -> Verification {
    let spoken = normalize(spoken);
    let expected = normalize(expected);

    if spoken.is_empty() || expected.is_empty() {
        debug!("Empty transcript or expected answer, no match");
        return Verification::no_match();
    }

    if spoken == expected {
        return Verification::matched(MatchKind::Exact, CONFIDENCE_EXACT);
    }

    if spoken.contains(&expected) {
        return Verification::matched(MatchKind::SpokenContainsExpected, CONFIDENCE_SPOKEN_CONTAINS_EXPECTED);
    }

    if spoken.chars().count() >= MIN_PARTIAL_ANSWER_CHARS && expected.contains(&spoken) {
        return Verification::matched(MatchKind::ExpectedContainsSpoken, CONFIDENCE_PARTIAL);
    }

    for variation in variations_of(&expected) {
        // Variations keep their literal phrasing ("it's a ..."); compare in canonical space
        let canonical = normalize(&variation);
        if canonical.is_empty() {
            continue;
        }
        if spoken == canonical || spoken.contains(&canonical) {
            debug!("Spoken '{}' matched variation '{}'", spoken, canonical);
            return Verification::matched(MatchKind::Variation(canonical), CONFIDENCE_VARIATION);
        }
    }

    Verification::no_match()
}
