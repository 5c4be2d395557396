//! The learner's progress aggregate
//!
//! A [`ProgressSnapshot`] is what gets persisted. Callers receive clones;
//! only the [`ProgressStore`](super::ProgressStore) mutates the stored one.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::streak::StreakState;
use crate::types::{ActivityFamily, ActivityOutcome};

/// Current persisted record layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Most recent outcomes kept in the history
pub const HISTORY_CAPACITY: usize = 50;

/// Flashcard sets and their card counts
pub const FLASHCARD_SETS: [(&str, u32); 5] = [
    ("letters", 26),
    ("numbers", 10),
    ("shapes", 8),
    ("colors", 10),
    ("objects", 20),
];

pub const ACTIVITY_TYPES: [&str; 3] = ["matching", "sorting", "memory"];

pub const CAMERA_GAME_MODES: [&str; 4] = ["object_recognition", "gestures", "emotions", "matching"];

/// Alternate subcategory spellings sent by activity UIs, mapped to their stored name
pub const SUBCATEGORY_ALIASES: [(&str, &str); 1] = [("objectRecognition", "object_recognition")];

fn canonical_subcategory(name: &str) -> &str {
    SUBCATEGORY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

pub const PUZZLE_TARGET: u32 = 10;

/// Target for activity types and camera game modes
pub const SESSION_TARGET: u32 = 10;

/// Progress within one subcategory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    completed_count: u32,
    total_target: u32,
    accuracy: u8,
    last_played_at: Option<DateTime<Utc>>,
    #[serde(default)]
    best_time_seconds: Option<u32>,
}

impl CategoryStat {
    pub fn new(total_target: u32) -> Self {
        Self {
            completed_count: 0,
            total_target,
            accuracy: 0,
            last_played_at: None,
            best_time_seconds: None,
        }
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    /// Fixed at creation
    pub fn total_target(&self) -> u32 {
        self.total_target
    }

    /// Last reported accuracy (overwritten, not averaged)
    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    pub fn last_played_at(&self) -> Option<DateTime<Utc>> {
        self.last_played_at
    }

    pub fn best_time_seconds(&self) -> Option<u32> {
        self.best_time_seconds
    }

    /// `completed / target`, 0 when the target is 0
    pub fn completion_ratio(&self) -> f64 {
        ratio(self.completed_count, self.total_target)
    }

    /// Overwrite the fields present in `update`. Validation is the caller's job.
    pub(crate) fn merge(&mut self, update: &CategoryStatUpdate) {
        if let Some(completed) = update.completed_count {
            self.completed_count = completed;
        }
        if let Some(accuracy) = update.accuracy {
            self.accuracy = accuracy;
        }
        if let Some(at) = update.last_played_at {
            self.last_played_at = Some(at);
        }
        if let Some(best) = update.best_time_seconds {
            self.best_time_seconds = Some(best);
        }
    }
}

/// Partial update for a [`CategoryStat`]; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStatUpdate {
    pub completed_count: Option<u32>,
    pub accuracy: Option<u8>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub best_time_seconds: Option<u32>,
}

impl CategoryStatUpdate {
    pub fn completed(mut self, count: u32) -> Self {
        self.completed_count = Some(count);
        self
    }

    pub fn accuracy(mut self, accuracy: u8) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn last_played(mut self, at: DateTime<Utc>) -> Self {
        self.last_played_at = Some(at);
        self
    }

    pub fn best_time(mut self, seconds: u32) -> Self {
        self.best_time_seconds = Some(seconds);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Complete persisted learner progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    version: u32,
    current_level: u32,
    flashcards: IndexMap<String, CategoryStat>,
    puzzles: CategoryStat,
    activities: IndexMap<String, CategoryStat>,
    camera_games: IndexMap<String, CategoryStat>,
    streak: StreakState,
    badges: IndexSet<String>,
    total_time_spent_seconds: u64,
    /// Newest first
    activity_history: VecDeque<ActivityOutcome>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            current_level: 1,
            flashcards: FLASHCARD_SETS
                .iter()
                .map(|(name, total)| (name.to_string(), CategoryStat::new(*total)))
                .collect(),
            puzzles: CategoryStat::new(PUZZLE_TARGET),
            activities: seeded(&ACTIVITY_TYPES),
            camera_games: seeded(&CAMERA_GAME_MODES),
            streak: StreakState::default(),
            badges: IndexSet::new(),
            total_time_spent_seconds: 0,
            activity_history: VecDeque::new(),
        }
    }
}

fn seeded(names: &[&str]) -> IndexMap<String, CategoryStat> {
    names
        .iter()
        .map(|name| (name.to_string(), CategoryStat::new(SESSION_TARGET)))
        .collect()
}

/// Re-add missing seeded subcategories and restore the seeded target of existing ones
fn reseed(stats: &mut IndexMap<String, CategoryStat>, seeds: IndexMap<String, CategoryStat>) {
    for (name, seed) in seeds {
        let target = seed.total_target;
        stats
            .entry(name)
            .and_modify(|stat| stat.total_target = target)
            .or_insert(seed);
    }
}

fn ratio(completed: u32, target: u32) -> f64 {
    if target == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(target)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

impl ProgressSnapshot {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    pub fn flashcards(&self) -> &IndexMap<String, CategoryStat> {
        &self.flashcards
    }

    pub fn puzzles(&self) -> &CategoryStat {
        &self.puzzles
    }

    pub fn activities(&self) -> &IndexMap<String, CategoryStat> {
        &self.activities
    }

    pub fn camera_games(&self) -> &IndexMap<String, CategoryStat> {
        &self.camera_games
    }

    pub fn streak(&self) -> &StreakState {
        &self.streak
    }

    /// Unlocked badges in unlock order
    pub fn badges(&self) -> &IndexSet<String> {
        &self.badges
    }

    pub fn total_time_spent_seconds(&self) -> u64 {
        self.total_time_spent_seconds
    }

    /// Recorded outcomes, newest first
    pub fn activity_history(&self) -> &VecDeque<ActivityOutcome> {
        &self.activity_history
    }

    /// The `n` most recent outcomes, newest first
    pub fn recent_history(&self, n: usize) -> Vec<ActivityOutcome> {
        self.activity_history.iter().take(n).cloned().collect()
    }

    /// Stats of a family as `(subcategory, stat)` pairs. Puzzles yield a single `("puzzles", _)` entry.
    pub fn family_stats(&self, family: ActivityFamily) -> Vec<(&str, &CategoryStat)> {
        let map = match family {
            ActivityFamily::Flashcards => &self.flashcards,
            ActivityFamily::Activities => &self.activities,
            ActivityFamily::CameraGames => &self.camera_games,
            ActivityFamily::Puzzles => return vec![("puzzles", &self.puzzles)],
        };
        map.iter().map(|(name, stat)| (name.as_str(), stat)).collect()
    }

    /// Look up one stat; `subcategory` must be `None` exactly for puzzles
    pub fn stat(&self, family: ActivityFamily, subcategory: Option<&str>) -> Option<&CategoryStat> {
        match (family, subcategory) {
            (ActivityFamily::Puzzles, None) => Some(&self.puzzles),
            (ActivityFamily::Puzzles, Some(_)) | (_, None) => None,
            (ActivityFamily::Flashcards, Some(name)) => self.flashcards.get(canonical_subcategory(name)),
            (ActivityFamily::Activities, Some(name)) => self.activities.get(canonical_subcategory(name)),
            (ActivityFamily::CameraGames, Some(name)) => self.camera_games.get(canonical_subcategory(name)),
        }
    }

    /// Mean completion ratio over the flashcard sets
    pub fn flashcard_completion(&self) -> f64 {
        mean(self.flashcards.values().map(CategoryStat::completion_ratio))
    }

    /// Overall progress in percent across all four families, camera games included
    pub fn overall_progress_percent(&self) -> u32 {
        let per_session = |map: &IndexMap<String, CategoryStat>| {
            mean(map.values().map(|s| ratio(s.completed_count, SESSION_TARGET)))
        };

        let flashcards = self.flashcard_completion() * 100.0;
        let puzzles = ratio(self.puzzles.completed_count, PUZZLE_TARGET) * 100.0;
        let activities = per_session(&self.activities) * 100.0;
        let camera = per_session(&self.camera_games) * 100.0;

        ((flashcards + puzzles + activities + camera) / 4.0).round() as u32
    }

    // --- Mutation, reserved for the store ---

    pub(crate) fn stat_mut(&mut self, family: ActivityFamily, subcategory: Option<&str>) -> Option<&mut CategoryStat> {
        match (family, subcategory) {
            (ActivityFamily::Puzzles, None) => Some(&mut self.puzzles),
            (ActivityFamily::Puzzles, Some(_)) | (_, None) => None,
            (ActivityFamily::Flashcards, Some(name)) => self.flashcards.get_mut(canonical_subcategory(name)),
            (ActivityFamily::Activities, Some(name)) => self.activities.get_mut(canonical_subcategory(name)),
            (ActivityFamily::CameraGames, Some(name)) => self.camera_games.get_mut(canonical_subcategory(name)),
        }
    }

    pub(crate) fn set_current_level(&mut self, level: u32) {
        self.current_level = self.current_level.max(level);
    }

    pub(crate) fn set_streak(&mut self, streak: StreakState) {
        self.streak = streak;
    }

    pub(crate) fn add_time_spent(&mut self, seconds: u32) {
        self.total_time_spent_seconds = self.total_time_spent_seconds.saturating_add(u64::from(seconds));
    }

    /// Prepend to the history, dropping the oldest entries past capacity
    pub(crate) fn push_outcome(&mut self, outcome: ActivityOutcome) {
        self.activity_history.push_front(outcome);
        self.activity_history.truncate(HISTORY_CAPACITY);
    }

    /// Returns false when the badge was already unlocked
    pub(crate) fn insert_badge(&mut self, name: String) -> bool {
        self.badges.insert(name)
    }

    /// Restore invariants on a record read back from storage
    pub(crate) fn repair(mut self) -> Self {
        let defaults = ProgressSnapshot::default();

        reseed(&mut self.flashcards, defaults.flashcards);
        reseed(&mut self.activities, defaults.activities);
        reseed(&mut self.camera_games, defaults.camera_games);
        self.puzzles.total_target = PUZZLE_TARGET;

        self.version = SNAPSHOT_VERSION;
        self.current_level = self.current_level.max(1);
        self.streak.longest = self.streak.longest.max(self.streak.current);
        self.activity_history.truncate(HISTORY_CAPACITY);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityCategory;

    fn outcome(score: u32) -> ActivityOutcome {
        ActivityOutcome {
            category: ActivityCategory::Puzzles,
            score,
            accuracy: 90,
            time_spent_seconds: 30,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_default_is_seeded() {
        let s = ProgressSnapshot::default();
        assert_eq!(s.current_level(), 1);
        assert_eq!(s.flashcards().len(), 5);
        assert_eq!(s.flashcards()["letters"].total_target(), 26);
        assert_eq!(s.flashcards()["shapes"].total_target(), 8);
        assert_eq!(s.puzzles().total_target(), PUZZLE_TARGET);
        assert_eq!(s.activities().len(), 3);
        assert_eq!(s.camera_games().len(), 4);
        assert!(s.badges().is_empty());
        assert!(s.activity_history().is_empty());
    }

    #[test]
    fn test_history_is_bounded_newest_first() {
        let mut s = ProgressSnapshot::default();
        for i in 0..60 {
            s.push_outcome(outcome(i));
        }
        assert_eq!(s.activity_history().len(), HISTORY_CAPACITY);
        assert_eq!(s.activity_history()[0].score, 59);
        assert_eq!(s.activity_history()[HISTORY_CAPACITY - 1].score, 10);
        assert_eq!(s.recent_history(3).iter().map(|o| o.score).collect::<Vec<_>>(), vec![59, 58, 57]);
    }

    #[test]
    fn test_stat_lookup_rules() {
        let s = ProgressSnapshot::default();
        assert!(s.stat(ActivityFamily::Puzzles, None).is_some());
        assert!(s.stat(ActivityFamily::Puzzles, Some("easy")).is_none());
        assert!(s.stat(ActivityFamily::Flashcards, None).is_none());
        assert!(s.stat(ActivityFamily::Flashcards, Some("letters")).is_some());
        assert!(s.stat(ActivityFamily::CameraGames, Some("emotions")).is_some());
        assert!(s.stat(ActivityFamily::Activities, Some("painting")).is_none());
    }

    #[test]
    fn test_merge_only_touches_given_fields() {
        let mut stat = CategoryStat::new(26);
        stat.merge(&CategoryStatUpdate::default().completed(5).accuracy(80));
        stat.merge(&CategoryStatUpdate::default().accuracy(60));
        assert_eq!(stat.completed_count(), 5);
        assert_eq!(stat.accuracy(), 60);
        assert_eq!(stat.total_target(), 26);
        assert_eq!(stat.last_played_at(), None);
    }

    #[test]
    fn test_overall_progress_includes_camera_games() {
        let mut s = ProgressSnapshot::default();
        assert_eq!(s.overall_progress_percent(), 0);

        for mode in CAMERA_GAME_MODES {
            s.stat_mut(ActivityFamily::CameraGames, Some(mode))
                .unwrap()
                .merge(&CategoryStatUpdate::default().completed(10));
        }
        assert_eq!(s.overall_progress_percent(), 25);
    }

    #[test]
    fn test_badges_are_unique() {
        let mut s = ProgressSnapshot::default();
        assert!(s.insert_badge("first-star".to_string()));
        assert!(!s.insert_badge("first-star".to_string()));
        assert_eq!(s.badges().len(), 1);
    }

    #[test]
    fn test_repair_restores_invariants() {
        let json = r#"{
            "version": 1,
            "current_level": 0,
            "flashcards": {},
            "streak": { "current": 5, "longest": 2, "last_activity_date": "2024-01-02" }
        }"#;
        let s: ProgressSnapshot = serde_json::from_str(json).unwrap();
        let s = s.repair();
        assert_eq!(s.current_level(), 1);
        assert_eq!(s.flashcards().len(), 5);
        assert_eq!(s.streak().longest, 5);
    }

    #[test]
    fn test_repair_restores_seeded_targets() {
        let json = r#"{
            "version": 1,
            "flashcards": { "letters": { "completed_count": 3, "total_target": 5, "accuracy": 70, "last_played_at": null } },
            "puzzles": { "completed_count": 2, "total_target": 99, "accuracy": 0, "last_played_at": null }
        }"#;
        let s: ProgressSnapshot = serde_json::from_str(json).unwrap();
        let s = s.repair();
        let letters = &s.flashcards()["letters"];
        assert_eq!(letters.total_target(), 26);
        assert_eq!(letters.completed_count(), 3);
        assert_eq!(letters.accuracy(), 70);
        assert_eq!(s.puzzles().total_target(), PUZZLE_TARGET);
        assert_eq!(s.puzzles().completed_count(), 2);
    }

    #[test]
    fn test_camera_mode_alias_resolves() {
        let mut s = ProgressSnapshot::default();
        s.stat_mut(ActivityFamily::CameraGames, Some("objectRecognition"))
            .unwrap()
            .merge(&CategoryStatUpdate::default().completed(2));
        assert_eq!(
            s.stat(ActivityFamily::CameraGames, Some("object_recognition")).map(CategoryStat::completed_count),
            Some(2)
        );
        assert!(s.stat(ActivityFamily::Flashcards, Some("objectRecognition")).is_none());
    }

    #[test]
    fn test_serde_round_trip_preserves_badge_order() {
        let mut s = ProgressSnapshot::default();
        s.insert_badge("zebra".to_string());
        s.insert_badge("apple".to_string());
        let json = serde_json::to_string(&s).unwrap();
        let back: ProgressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.badges().iter().collect::<Vec<_>>(), vec!["zebra", "apple"]);
    }
}
