//! Shared types used across modules
//!
//! Activity families, category tags and the outcome record are consumed by
//! both the progress store and the recommender, so they live here to avoid
//! circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four top-level trackable domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFamily {
    Flashcards,
    Puzzles,
    Activities,
    CameraGames,
}

impl ActivityFamily {
    /// All families in display order
    pub fn all() -> &'static [ActivityFamily] {
        &[
            ActivityFamily::Flashcards,
            ActivityFamily::Puzzles,
            ActivityFamily::Activities,
            ActivityFamily::CameraGames,
        ]
    }

    /// Whether the family is split into named subcategories
    pub fn is_subdivided(&self) -> bool {
        !matches!(self, ActivityFamily::Puzzles)
    }

    /// Parse a family name as used in tags and on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flashcards" | "flashcard" => Some(ActivityFamily::Flashcards),
            "puzzles" | "puzzle" => Some(ActivityFamily::Puzzles),
            "activities" | "activity" => Some(ActivityFamily::Activities),
            "camera" | "camera_games" | "camera-games" | "cv" => Some(ActivityFamily::CameraGames),
            _ => None,
        }
    }

    fn tag_prefix(&self) -> &'static str {
        match self {
            ActivityFamily::Flashcards => "flashcards",
            ActivityFamily::Puzzles => "puzzles",
            ActivityFamily::Activities => "activities",
            ActivityFamily::CameraGames => "camera",
        }
    }
}

impl std::fmt::Display for ActivityFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityFamily::Flashcards => write!(f, "flashcards"),
            ActivityFamily::Puzzles => write!(f, "puzzles"),
            ActivityFamily::Activities => write!(f, "activities"),
            ActivityFamily::CameraGames => write!(f, "camera_games"),
        }
    }
}

/// Identifier naming the activity an outcome came from
///
/// Tags are plain strings on the wire (`flashcards-letters`, `puzzles`,
/// `activities-memory`, `camera-gestures`). Tags outside the known families
/// are kept verbatim as [`ActivityCategory::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActivityCategory {
    Flashcards(String),
    Puzzles,
    Activities(String),
    CameraGames(String),
    Other(String),
}

impl ActivityCategory {
    /// Parse a category tag. Fails only on malformed tags (empty or containing whitespace).
    pub fn parse(tag: &str) -> Result<Self, MalformedTag> {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(MalformedTag(tag.to_string()));
        }

        if tag == "puzzles" {
            return Ok(ActivityCategory::Puzzles);
        }

        let category = match tag.split_once('-') {
            Some(("flashcards", sub)) if !sub.is_empty() => ActivityCategory::Flashcards(sub.to_string()),
            Some(("activities", sub)) if !sub.is_empty() => ActivityCategory::Activities(sub.to_string()),
            Some(("camera" | "cv", sub)) if !sub.is_empty() => ActivityCategory::CameraGames(sub.to_string()),
            _ => ActivityCategory::Other(tag.to_string()),
        };
        Ok(category)
    }

    /// Check that the tag reads back as itself from its string form.
    ///
    /// Variants built directly (bypassing [`ActivityCategory::parse`]) can hold
    /// payloads that would not survive storage, e.g. `Flashcards("two words")`
    /// or `Other("puzzles")`.
    pub fn validate(&self) -> Result<(), MalformedTag> {
        let tag = self.to_string();
        match ActivityCategory::parse(&tag) {
            Ok(parsed) if parsed == *self => Ok(()),
            _ => Err(MalformedTag(tag)),
        }
    }

    /// Family this tag belongs to, if any
    pub fn family(&self) -> Option<ActivityFamily> {
        match self {
            ActivityCategory::Flashcards(_) => Some(ActivityFamily::Flashcards),
            ActivityCategory::Puzzles => Some(ActivityFamily::Puzzles),
            ActivityCategory::Activities(_) => Some(ActivityFamily::Activities),
            ActivityCategory::CameraGames(_) => Some(ActivityFamily::CameraGames),
            ActivityCategory::Other(_) => None,
        }
    }

    /// Subcategory within the family (`None` for puzzles and unknown tags)
    pub fn subcategory(&self) -> Option<&str> {
        match self {
            ActivityCategory::Flashcards(s)
            | ActivityCategory::Activities(s)
            | ActivityCategory::CameraGames(s) => Some(s),
            ActivityCategory::Puzzles | ActivityCategory::Other(_) => None,
        }
    }
}

impl std::fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityCategory::Puzzles => write!(f, "puzzles"),
            ActivityCategory::Other(tag) => write!(f, "{}", tag),
            other => {
                // family() and subcategory() are always Some for the remaining variants
                let prefix = other.family().map(|fam| fam.tag_prefix()).unwrap_or_default();
                write!(f, "{}-{}", prefix, other.subcategory().unwrap_or_default())
            }
        }
    }
}

impl std::str::FromStr for ActivityCategory {
    type Err = MalformedTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityCategory::parse(s)
    }
}

impl TryFrom<String> for ActivityCategory {
    type Error = MalformedTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ActivityCategory::parse(&value)
    }
}

impl From<ActivityCategory> for String {
    fn from(value: ActivityCategory) -> Self {
        value.to_string()
    }
}

/// A category tag that cannot be stored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed category tag: {0:?}")]
pub struct MalformedTag(pub String);

/// What a caller reports when an activity is completed
///
/// The timestamp is deliberately absent: the progress store stamps each
/// outcome with its own clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeInput {
    pub category: ActivityCategory,
    pub score: u32,
    /// Percentage in 0..=100, checked by the store
    pub accuracy: u8,
    /// 0 means the activity was not timed
    pub time_spent_seconds: u32,
}

impl OutcomeInput {
    pub fn new(category: ActivityCategory, score: u32, accuracy: u8, time_spent_seconds: u32) -> Self {
        Self {
            category,
            score,
            accuracy,
            time_spent_seconds,
        }
    }
}

/// A completed attempt, as stored in the activity history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityOutcome {
    pub category: ActivityCategory,
    pub score: u32,
    pub accuracy: u8,
    pub time_spent_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

impl ActivityOutcome {
    pub(crate) fn stamp(input: OutcomeInput, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: input.category,
            score: input.score,
            accuracy: input.accuracy,
            time_spent_seconds: input.time_spent_seconds,
            timestamp,
        }
    }
}
